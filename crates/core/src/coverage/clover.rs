//! Clover coverage XML dataset
//!
//! A Clover report looks like this; file nodes may sit directly under the
//! project or be grouped into packages:
//!
//! ```xml
//! <coverage generated="1700000000">
//!   <project timestamp="1700000000" name="app">
//!     <file name="/abs/path/src/lib.rs">
//!       <class name="Foo"><metrics statements="3" coveredstatements="1"/></class>
//!       <line num="3" type="stmt" count="6"/>
//!       <metrics statements="10" coveredstatements="8"/>
//!     </file>
//!     <package name="util">
//!       <file name="/abs/path/src/util.rs">...</file>
//!     </package>
//!     <metrics statements="20" coveredstatements="12"/>
//!   </project>
//! </coverage>
//! ```

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

/// Statement counts attached to a file or project node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementMetrics {
    pub statements: u64,
    pub covered_statements: u64,
}

/// One `<line>` annotation: execution count of a source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStat {
    pub num: u64,
    pub kind: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    pub metrics: StatementMetrics,
    pub lines: Vec<LineStat>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageNode {
    pub name: Option<String>,
    pub files: Vec<FileNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectNode {
    pub name: Option<String>,
    pub timestamp: Option<i64>,
    pub metrics: Option<StatementMetrics>,
    pub files: Vec<FileNode>,
    pub packages: Vec<PackageNode>,
}

/// Parsed Clover coverage report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloverDataset {
    pub project: Option<ProjectNode>,
}

impl CloverDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|_| {
            Error::ReportSource(format!(
                "File '{}' not found or is not readable.",
                path.display()
            ))
        })?;
        Self::parse(&contents).map_err(|e| match e {
            Error::ReportSource(msg) => {
                Error::ReportSource(format!("{msg} in file {}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(xml: &str) -> Result<Self> {
        Parser::default().run(xml)
    }

    /// All file nodes: those directly under the project first, then each
    /// package's files in document order
    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.project.iter().flat_map(|project| {
            project
                .files
                .iter()
                .chain(project.packages.iter().flat_map(|p| p.files.iter()))
        })
    }

    pub fn find_file(&self, name: &str) -> Option<&FileNode> {
        self.files().find(|file| file.name == name)
    }

    /// Report title: the project name, else the first package's name
    pub fn title(&self) -> Option<&str> {
        let project = self.project.as_ref()?;
        project
            .name
            .as_deref()
            .or_else(|| project.packages.first().and_then(|p| p.name.as_deref()))
    }

    pub fn timestamp(&self) -> i64 {
        self.project
            .as_ref()
            .and_then(|p| p.timestamp)
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct Parser {
    stack: Vec<String>,
    saw_root: bool,
    project: Option<ProjectNode>,
    package: Option<PackageNode>,
    file: Option<FileNode>,
}

impl Parser {
    fn run(mut self, xml: &str) -> Result<CloverDataset> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::ReportSource(format!(
                    "{e} at position {}",
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(e) => {
                    self.open(&e)?;
                    self.stack.push(element_name(&e));
                }
                Event::Empty(e) => {
                    self.open(&e)?;
                    self.close(&element_name(&e));
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.stack.pop();
                    self.close(&name);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !self.saw_root {
            return Err(Error::ReportSource("Document is empty".to_string()));
        }

        Ok(CloverDataset {
            project: self.project,
        })
    }

    fn parent(&self) -> Option<String> {
        self.stack.last().cloned()
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.saw_root = true;
        let name = element_name(e);
        let parent = self.parent();

        match (name.as_str(), parent.as_deref()) {
            ("project", _) if self.project.is_none() => {
                self.project = Some(ProjectNode {
                    name: attribute(e, "name")?,
                    timestamp: attribute(e, "timestamp")?.and_then(|t| t.parse().ok()),
                    ..Default::default()
                });
            }
            ("package", Some("project")) => {
                self.package = Some(PackageNode {
                    name: attribute(e, "name")?,
                    files: Vec::new(),
                });
            }
            ("file", Some("project" | "package")) => {
                self.file = Some(FileNode {
                    name: attribute(e, "name")?.unwrap_or_default(),
                    ..Default::default()
                });
            }
            ("metrics", Some("file")) => {
                if let Some(file) = self.file.as_mut() {
                    file.metrics = statement_metrics(e)?;
                }
            }
            ("metrics", Some("project")) => {
                let metrics = statement_metrics(e)?;
                if let Some(project) = self.project.as_mut() {
                    project.metrics = Some(metrics);
                }
            }
            ("line", Some("file")) => {
                let num = attribute(e, "num")?.and_then(|n| n.parse().ok());
                if let (Some(file), Some(num)) = (self.file.as_mut(), num) {
                    file.lines.push(LineStat {
                        num,
                        kind: attribute(e, "type")?,
                        count: attribute(e, "count")?
                            .and_then(|c| c.parse().ok())
                            .unwrap_or(0),
                    });
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn close(&mut self, name: &str) {
        let parent = self.parent();
        match (name, parent.as_deref()) {
            ("file", Some("package")) => {
                if let (Some(file), Some(package)) = (self.file.take(), self.package.as_mut()) {
                    package.files.push(file);
                }
            }
            ("file", Some("project")) => {
                if let (Some(file), Some(project)) = (self.file.take(), self.project.as_mut()) {
                    project.files.push(file);
                }
            }
            ("package", Some("project")) => {
                if let (Some(package), Some(project)) =
                    (self.package.take(), self.project.as_mut())
                {
                    project.packages.push(package);
                }
            }
            _ => {}
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::ReportSource(err.to_string()))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| Error::ReportSource(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn statement_metrics(e: &BytesStart<'_>) -> Result<StatementMetrics> {
    let count = |key| -> Result<u64> {
        Ok(attribute(e, key)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    };
    Ok(StatementMetrics {
        statements: count("statements")?,
        covered_statements: count("coveredstatements")?,
    })
}

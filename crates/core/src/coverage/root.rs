//! Common root detection for coverage file paths

const SEPARATOR: char = '/';

/// Longest common directory prefix of `paths`, compared segment by segment.
///
/// The result is either empty or ends with `/`, so a shared character prefix
/// such as `foo/bar/ba` in `foo/bar/baz` and `foo/bar/bax` is never reported.
pub fn find_common_root<S: AsRef<str>>(paths: &[S]) -> String {
    match paths {
        [] => String::new(),
        [only] => common_root_one(only.as_ref()),
        _ => common_root_many(paths),
    }
}

/// Directory component of a single path, with a trailing separator
fn common_root_one(path: &str) -> String {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    let dir = segments[..segments.len() - 1].join("/");
    with_trailing_separator(dir)
}

fn common_root_many<S: AsRef<str>>(paths: &[S]) -> String {
    let split: Vec<Vec<&str>> = paths
        .iter()
        .map(|p| p.as_ref().split(SEPARATOR).collect())
        .collect();
    let longest = split.iter().map(Vec::len).max().unwrap_or(0);

    let mut root = String::new();
    for i in 1..=longest {
        let mut prefixes = split
            .iter()
            .map(|segments| with_trailing_separator(segments[..i.min(segments.len())].join("/")));

        let Some(first) = prefixes.next() else {
            break;
        };
        if prefixes.any(|prefix| prefix != first) {
            return root;
        }
        root = first;
    }

    root
}

fn with_trailing_separator(mut path: String) -> String {
    if !path.ends_with(SEPARATOR) {
        path.push(SEPARATOR);
    }
    path
}

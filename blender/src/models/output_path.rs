/*
    Blender writes the frame number in place of a run of `#` in the output path, e.g.
    `/renders/shot_####.png` becomes `/renders/shot_0042.png`. When the submitter hands us
    a path blender already resolved for the first frame, we have to turn the digits back
    into a placeholder of the same width so Deadline knows where to find the frames.
*/

const DEFAULT_PADDING: usize = 4;

// Split the path into directory (including the trailing separator), file stem and extension (including the dot)
// This is done by hand since the path may come from another operating system than the one we're running on.
fn split(path: &str) -> (&str, &str, &str) {
    let name_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let (directory, name) = path.split_at(name_start);
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, extension) = name.split_at(dot);
            (directory, stem, extension)
        }
        _ => (directory, name, ""),
    }
}

fn padding_run(stem: &str) -> usize {
    let hashes = stem.chars().rev().take_while(|c| *c == '#').count();
    if hashes > 0 {
        hashes
    } else {
        stem.chars().rev().take_while(|c| c.is_ascii_digit()).count()
    }
}

/// Number of digits (or `#`) at the end of the file name, 0 if there's none.
pub fn padding_size(path: &str) -> usize {
    let (_, stem, _) = split(path);
    padding_run(stem)
}

/// Remove the frame number (or placeholder) at the end of the file name.
pub fn without_padding(path: &str) -> String {
    let (directory, stem, extension) = split(path);
    let stem = &stem[..stem.len() - padding_run(stem)];
    format!("{directory}{stem}{extension}")
}

/// Replace the frame number blender wrote into the path with a `#` placeholder of the same width.
/// `/renders/shot_0001.png` -> `/renders/shot_####.png`
pub fn to_placeholder(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let (directory, stem, extension) = split(path);
    let size = padding_run(stem);
    let prefix = &stem[..stem.len() - size];
    format!("{directory}{prefix}{}{extension}", "#".repeat(size))
}

/// Make sure there is somewhere for blender to write the frame number.
/// If the path has no `#` at all, a four digit placeholder is added before the extension.
pub fn ensure_placeholder(path: &str) -> String {
    if path.is_empty() || path.contains('#') {
        return path.to_owned();
    }
    let (directory, stem, extension) = split(path);
    format!("{directory}{stem}{}{extension}", "#".repeat(DEFAULT_PADDING))
}

/// Directory part of the output path, used to check the folder exist before submitting.
pub fn directory(path: &str) -> &str {
    let (directory, _, _) = split(path);
    directory.trim_end_matches(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_padding() {
        assert_eq!(padding_size("/renders/shot_0001.png"), 4);
        assert_eq!(padding_size("C:\\renders\\shot_00001.exr"), 5);
        assert_eq!(padding_size("/renders/shot_###.png"), 3);
        assert_eq!(padding_size("/renders/shot.png"), 0);
        // digits in the directory don't count
        assert_eq!(padding_size("/renders/2024/shot.png"), 0);
    }

    #[test]
    fn strip_padding() {
        assert_eq!(without_padding("/renders/shot_0001.png"), "/renders/shot_.png");
        assert_eq!(without_padding("/renders/shot_####.png"), "/renders/shot_.png");
        assert_eq!(without_padding("shot.png"), "shot.png");
    }

    #[test]
    fn rendered_path_to_placeholder() {
        assert_eq!(to_placeholder("/tmp/render/0001.png"), "/tmp/render/####.png");
        assert_eq!(
            to_placeholder("C:\\renders\\shot_010.jpg"),
            "C:\\renders\\shot_###.jpg"
        );
        assert_eq!(to_placeholder("/tmp/render/shot.png"), "/tmp/render/shot.png");
        assert_eq!(to_placeholder(""), "");
    }

    #[test]
    fn add_default_placeholder() {
        assert_eq!(ensure_placeholder("/renders/shot_.png"), "/renders/shot_####.png");
        assert_eq!(ensure_placeholder("/renders/shot_##.png"), "/renders/shot_##.png");
        assert_eq!(ensure_placeholder("/renders/.hidden"), "/renders/.hidden####");
        assert_eq!(ensure_placeholder("/renders/shot"), "/renders/shot####");
    }

    #[test]
    fn output_directory() {
        assert_eq!(directory("/renders/shot/shot_####.png"), "/renders/shot");
        assert_eq!(directory("C:\\renders\\shot_####.png"), "C:\\renders");
        assert_eq!(directory("shot_####.png"), "");
    }
}

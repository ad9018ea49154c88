use super::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::path::Path;

// ref: https://docs.blender.org/manual/en/latest/advanced/command_line/render.html
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Args {
    file: String,           // required
    output: Option<String>, // optional - otherwise use the output path saved in the blend file
    threads: u32,           // 0 lets blender use all cores
    start: i32,
    end: i32,
}

impl Args {
    /// Paths are rewritten for the given platform before they end up on the command line.
    pub fn new(file: impl AsRef<Path>, start: i32, end: i32, platform: Platform) -> Self {
        let file = platform.normalize_path(&file.as_ref().to_string_lossy());
        Args {
            file,
            output: None,
            threads: 0,
            start,
            end,
        }
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    /// Blank output keeps the output path saved in the blend file.
    pub fn with_output(mut self, output: &str, platform: Platform) -> Self {
        self.output = match output.trim() {
            "" => None,
            output => Some(platform.normalize_path(output)),
        };
        self
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn create_arg_list(&self) -> Vec<String> {
        // More context: https://docs.blender.org/manual/en/latest/advanced/command_line/arguments.html#argument-order
        // # is substitute to 0 pad, none will add to suffix four pounds (####)
        let mut col = vec![
            "-b".to_owned(),
            self.file.clone(),
            "-t".to_owned(),
            self.threads.to_string(),
        ];

        // -x 1 explicitly add the file extension to the output
        if let Some(output) = &self.output {
            col.push("-x".to_owned());
            col.push("1".to_owned());
            col.push("-o".to_owned());
            col.push(output.clone());
        }

        // this argument must be set at the very end
        col.append(&mut vec![
            "-s".to_owned(),
            self.start.to_string(),
            "-e".to_owned(),
            self.end.to_string(),
            "-a".to_owned(),
        ]);

        col
    }
}

// The way it would look like typed in a shell, used for logs.
impl Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-b \"{}\" -t {}", self.file, self.threads)?;
        if let Some(output) = &self.output {
            write!(f, " -x 1 -o \"{output}\"")?;
        }
        write!(f, " -s {} -e {} -a", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_list_without_output() {
        let args = Args::new("/projects/shot/scene.blend", 1, 10, Platform::Unix).with_threads(8);
        assert_eq!(
            args.create_arg_list(),
            vec!["-b", "/projects/shot/scene.blend", "-t", "8", "-s", "1", "-e", "10", "-a"]
        );
        assert_eq!(
            args.to_string(),
            "-b \"/projects/shot/scene.blend\" -t 8 -s 1 -e 10 -a"
        );
    }

    #[test]
    fn arg_list_with_output_on_windows() {
        let args = Args::new("//server/projects/scene.blend", 5, 5, Platform::Windows)
            .with_output("//server/renders/shot_####.png", Platform::Windows);
        assert_eq!(
            args.create_arg_list(),
            vec![
                "-b",
                "\\\\server\\projects\\scene.blend",
                "-t",
                "0",
                "-x",
                "1",
                "-o",
                "\\\\server\\renders\\shot_####.png",
                "-s",
                "5",
                "-e",
                "5",
                "-a"
            ]
        );
        assert_eq!(
            args.to_string(),
            "-b \"\\\\server\\projects\\scene.blend\" -t 0 -x 1 -o \"\\\\server\\renders\\shot_####.png\" -s 5 -e 5 -a"
        );
    }

    #[test]
    fn blank_output_is_ignored() {
        let args = Args::new("scene.blend", 1, 2, Platform::Unix).with_output("  ", Platform::Unix);
        assert_eq!(args.output(), None);
        assert!(!args.create_arg_list().contains(&"-o".to_owned()));
    }
}

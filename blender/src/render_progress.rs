/*
    Developer blog:
    - Blender does not give us a percentage. It prints tiles (Cycles tile render), samples
    (Cycles progressive render), scene parts (Blender Internal) and a "Saved:" line per frame.
    This module keeps track of those lines for one task and turns them into a percentage and
    a status message that Deadline can display.
    - Blender Internal lists its scene parts out of order, and motion blur / sub-surf sampling
    repeat them without telling us how many loops there will be. Counting them gave us
    progress bars going backwards, so those lines only redraw the current state.
*/
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::path::PathBuf;

/// Which sub-frame progress signal is currently used to display progress.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkType {
    #[default]
    None,
    Tile,
    Sample,
}

impl Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkType::None => Ok(()),
            ChunkType::Tile => write!(f, "tile"),
            ChunkType::Sample => write!(f, "sample"),
        }
    }
}

/// Progress of a single render task. Create a new one for every task, never share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    total_frames: u32,
    finished_frames: u32,
    chunk_type: ChunkType,
    current_chunk: u32,
    total_chunks: u32,
}

impl ProgressState {
    /// A task always renders at least one frame.
    pub fn new(total_frames: u32) -> Self {
        Self {
            total_frames: total_frames.max(1),
            finished_frames: 0,
            chunk_type: ChunkType::None,
            current_chunk: 0,
            total_chunks: 0,
        }
    }

    /// Frame range is inclusive on both end, e.g. 1 to 10 is 10 frames.
    pub fn from_frames(start: i32, end: i32) -> Self {
        let total = (i64::from(end) - i64::from(start) + 1).clamp(1, i64::from(u32::MAX));
        Self::new(total as u32)
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn finished_frames(&self) -> u32 {
        self.finished_frames
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.chunk_type
    }

    pub fn current_chunk(&self) -> u32 {
        self.current_chunk
    }

    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    /// Once the last frame of the task is saved there's nothing left to render.
    pub fn is_complete(&self) -> bool {
        self.finished_frames >= self.total_frames
    }

    fn set_chunk(&mut self, chunk_type: ChunkType, current: u32, total: u32) {
        self.chunk_type = chunk_type;
        self.current_chunk = current;
        self.total_chunks = total;
    }

    fn frame_saved(&mut self) {
        self.finished_frames = self.finished_frames.saturating_add(1);
        // Otherwise the previous frame's chunk gets added on top of the new frame's base.
        self.current_chunk = 0;
        self.chunk_type = ChunkType::None;
    }

    /// Task progress between 0.0 and 1.0
    pub fn fraction(&self) -> f32 {
        let mut progress = self.finished_frames as f32;
        if self.chunk_type != ChunkType::None && self.total_chunks > 0 {
            progress += (self.current_chunk as f32 / self.total_chunks as f32).min(1.0);
        }
        (progress / self.total_frames as f32).clamp(0.0, 1.0)
    }

    /// Human readable status of the task.
    pub fn message(&self) -> String {
        // This avoids showing "Rendering frame 2/1" after the last frame is saved
        if self.is_complete() {
            return "Task complete.".to_owned();
        }

        let frame = self.finished_frames + 1;
        match self.chunk_type {
            ChunkType::None => format!(
                "Rendering frame {frame}/{} for this task",
                self.total_frames
            ),
            chunk_type => format!(
                "Rendering {chunk_type} {}/{} of frame {frame}/{} for this task",
                self.current_chunk, self.total_chunks, self.total_frames
            ),
        }
    }

    pub fn report(&self) -> ProgressReport {
        ProgressReport {
            fraction: self.fraction(),
            message: self.message(),
        }
    }
}

/// Snapshot of the task progress to hand over to Deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub fraction: f32,
    pub message: String,
}

impl ProgressReport {
    /// Deadline expects progress between 0 and 100
    pub fn percent(&self) -> f32 {
        self.fraction * 100.0
    }
}

/// What to do with a line blender printed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Rule {
    /// "Tile X/Y" - Cycles tile render
    Tile,
    /// "Sample X/Y" - Cycles progressive render
    Sample,
    /// "Scene, Part X-Y" - Blender Internal, display only
    ScenePart,
    /// "Saved: ..." - a frame is written to disk
    Saved,
    /// Blender can't go on, the task must fail.
    Failure,
}

/// Result of a line that matched one of the rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Progress(ProgressReport),
    FrameSaved {
        report: ProgressReport,
        // path blender wrote the frame to, if we could read it off the line
        output: Option<PathBuf>,
    },
    Fail(String),
}

#[derive(Debug, Clone)]
struct Pattern {
    rule: Rule,
    regex: Regex,
}

// Order matters, first match wins.
const PATTERNS: &[(Rule, &str)] = &[
    (Rule::Tile, r"Tile ([0-9]+)/([0-9]+)"),
    (Rule::Sample, r"Sample ([0-9]+)/([0-9]+)"),
    (Rule::ScenePart, r"Scene, Part ([0-9]+)-([0-9]+)"),
    (Rule::Saved, r"Saved:"),
    (Rule::Failure, r"^Unable to open"),
    (Rule::Failure, r"^Failed to read blend file"),
    (Rule::Failure, r"Unable to create directory"),
];

/// Maps blender stdout lines to progress updates using a fixed, ordered table of patterns.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: Vec<Pattern>,
}

impl Classifier {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = PATTERNS
            .iter()
            .map(|(rule, pattern)| {
                Ok(Pattern {
                    rule: *rule,
                    regex: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    /// Find the rule of the first pattern matching this line.
    pub fn rule_for(&self, line: &str) -> Option<Rule> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(line))
            .map(|p| p.rule)
    }

    /// Update the task state with one line of blender output.
    /// Returns None and leave the state alone if the line means nothing to us.
    pub fn classify(&self, state: &mut ProgressState, line: &str) -> Option<Outcome> {
        let line = line.trim_end_matches(['\r', '\n']);

        for pattern in self.patterns.iter().filter(|p| p.regex.is_match(line)) {
            match pattern.rule {
                Rule::Tile | Rule::Sample => {
                    // digits too large for u32 are garbage, the remaining rules still get a look
                    let Some((current, total)) = chunk_counts(&pattern.regex, line) else {
                        continue;
                    };
                    let chunk_type = match pattern.rule {
                        Rule::Tile => ChunkType::Tile,
                        _ => ChunkType::Sample,
                    };
                    state.set_chunk(chunk_type, current, total);
                    return Some(Outcome::Progress(state.report()));
                }
                Rule::ScenePart => return Some(Outcome::Progress(state.report())),
                Rule::Saved => {
                    state.frame_saved();
                    return Some(Outcome::FrameSaved {
                        report: state.report(),
                        output: saved_path(line),
                    });
                }
                Rule::Failure => return Some(Outcome::Fail(line.to_owned())),
            }
        }

        None
    }
}

fn chunk_counts(regex: &Regex, line: &str) -> Option<(u32, u32)> {
    let captures = regex.captures(line)?;
    let current = captures.get(1)?.as_str().parse().ok()?;
    let total = captures.get(2)?.as_str().parse().ok()?;
    Some((current, total))
}

/// Blender 2.7x prints `Saved: /tmp/0001.png`, newer versions quote the path `Saved: '/tmp/0001.png'`
fn saved_path(line: &str) -> Option<PathBuf> {
    let (_, rest) = line.split_once("Saved:")?;
    let rest = rest.trim();
    let path = match rest.strip_prefix('\'') {
        Some(quoted) => quoted.split('\'').next().unwrap_or_default(),
        // older versions append the time it took to save, e.g. " Time: 00:00.03"
        None => rest.split(" Time:").next().unwrap_or_default().trim(),
    };

    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

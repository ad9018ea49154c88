use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameListError {
    #[error("Frame range is empty")]
    Empty,
    #[error("Frame range {0} is not valid")]
    InvalidToken(String),
    #[error("Frame step in {0} must be greater than zero")]
    InvalidStep(String),
    #[error("Unable to create frame range pattern: {0}")]
    Pattern(String),
}

/// One entry of a frame list, e.g. `1-100x5`. Start can be greater than end to render backward.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i32,
    pub end: i32,
    pub step: u32,
}

impl FrameRange {
    pub fn frames(&self) -> impl Iterator<Item = i32> {
        let step = i64::from(self.step);
        let (start, end) = (i64::from(self.start), i64::from(self.end));
        let count = (start - end).abs() / step + 1;
        let direction = if start <= end { step } else { -step };
        (0..count).map(move |i| (start + i * direction) as i32)
    }
}

impl Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start == self.end, self.step) {
            (true, _) => write!(f, "{}", self.start),
            (false, 1) => write!(f, "{}-{}", self.start, self.end),
            (false, step) => write!(f, "{}-{}x{}", self.start, self.end, step),
        }
    }
}

/// List of frames the user wants rendered, e.g. `1-10,20,30-50x2`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameList {
    ranges: Vec<FrameRange>,
}

impl FrameList {
    pub fn parse(input: &str) -> Result<Self, FrameListError> {
        let pattern = Regex::new(r"(?i)^(-?\d+)(?:-(-?\d+)(?:(?:x|step|by|:)(\d+))?)?$")
            .map_err(|e| FrameListError::Pattern(e.to_string()))?;

        let ranges = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                let invalid = || FrameListError::InvalidToken(token.to_owned());
                let captures = pattern.captures(token).ok_or_else(invalid)?;
                let start = captures[1].parse::<i32>().map_err(|_| invalid())?;
                let end = match captures.get(2) {
                    Some(end) => end.as_str().parse::<i32>().map_err(|_| invalid())?,
                    None => start,
                };
                let step = match captures.get(3) {
                    Some(step) => step.as_str().parse::<u32>().map_err(|_| invalid())?,
                    None => 1,
                };
                if step == 0 {
                    return Err(FrameListError::InvalidStep(token.to_owned()));
                }
                Ok(FrameRange { start, end, step })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ranges.is_empty() {
            return Err(FrameListError::Empty);
        }
        Ok(Self { ranges })
    }

    /// Same check the submitter does before writing the job file.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn ranges(&self) -> &[FrameRange] {
        &self.ranges
    }

    pub fn frames(&self) -> impl Iterator<Item = i32> + '_ {
        self.ranges.iter().flat_map(|range| range.frames())
    }

    pub fn first(&self) -> Option<i32> {
        self.frames().next()
    }
}

impl FromStr for FrameList {
    type Err = FrameListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for FrameList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges = self
            .ranges
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{ranges}")
    }
}

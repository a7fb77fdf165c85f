//! Decodes recorded tracker sessions. Each line is one event, either a frame
//!
//! ```text
//! +FRAME:<timestamp>,<yaw>,<m0>,<m1>,...,<m15>
//! ```
//!
//! with the sixteen transform entries in the provider's [`MatrixLayout`], or
//! a tracking-state change
//!
//! ```text
//! +TRACKING:NORMAL
//! +TRACKING:LIMITED:EXCESSIVE_MOTION
//! +TRACKING:NOT_AVAILABLE
//! ```

use crate::pose::{FrameUpdate, MatrixLayout};
use crate::tracking_state::{CameraTrackingState, LimitedReason};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, space0},
    combinator::{all_consuming, map, value},
    error::Error,
    multi::count,
    number::complete::double,
    sequence::{preceded, terminated, tuple},
    Finish, IResult,
};
use std::fmt;

/// Something the tracking provider told us.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// A new camera frame
    Frame(FrameUpdate),
    /// The tracking state changed
    State(CameraTrackingState),
}

fn parse_entries(s: &str) -> IResult<&str, [f64; 16]> {
    map(count(preceded(char(','), double), 16), |entries: Vec<f64>| {
        let mut out = [0.0; 16];
        out.copy_from_slice(&entries);
        out
    })(s)
}

fn parse_frame<'a>(layout: MatrixLayout) -> impl Fn(&'a str) -> IResult<&'a str, TrackerEvent> {
    move |s: &'a str| {
        map(
            tuple((preceded(tag("+FRAME:"), double), preceded(char(','), double), parse_entries)),
            |(timestamp, yaw, entries)| {
                TrackerEvent::Frame(FrameUpdate::from_entries(&entries, layout, yaw, timestamp))
            },
        )(s)
    }
}

fn parse_limited_reason(s: &str) -> IResult<&str, LimitedReason> {
    alt((
        value(LimitedReason::Initializing, tag("INITIALIZING")),
        value(LimitedReason::InsufficientFeatures, tag("INSUFFICIENT_FEATURES")),
        value(LimitedReason::ExcessiveMotion, tag("EXCESSIVE_MOTION")),
        value(LimitedReason::Relocalizing, tag("RELOCALIZING")),
    ))(s)
}

fn parse_tracking(s: &str) -> IResult<&str, TrackerEvent> {
    map(
        preceded(
            tag("+TRACKING:"),
            alt((
                value(CameraTrackingState::Normal, tag("NORMAL")),
                value(CameraTrackingState::NotAvailable, tag("NOT_AVAILABLE")),
                map(
                    preceded(tag("LIMITED:"), parse_limited_reason),
                    CameraTrackingState::Limited,
                ),
            )),
        ),
        TrackerEvent::State,
    )(s)
}

fn parse_event<'a>(layout: MatrixLayout) -> impl Fn(&'a str) -> IResult<&'a str, TrackerEvent> {
    move |s: &'a str| {
        all_consuming(terminated(
            alt((parse_frame(layout), parse_tracking)),
            space0,
        ))(s)
    }
}

impl TrackerEvent {
    /// Decodes one line, reading transforms in `layout`. Trailing whitespace
    /// and line endings are ignored.
    pub fn decode(line: &str, layout: MatrixLayout) -> Result<Self, Error<String>> {
        let line = line.trim_end_matches(['\r', '\n']);
        match parse_event(layout)(line).finish() {
            Ok((_remaining, event)) => Ok(event),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

/// Decodes a whole session, skipping blank lines and `#` comments. Lines that
/// fail to decode are returned alongside their (1-based) line number rather
/// than aborting the whole session.
pub fn decode_session(
    text: &str,
    layout: MatrixLayout,
) -> (Vec<TrackerEvent>, Vec<(usize, Error<String>)>) {
    let mut events = Vec::new();
    let mut failures = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match TrackerEvent::decode(trimmed, layout) {
            Ok(event) => events.push(event),
            Err(e) => failures.push((number + 1, e)),
        }
    }
    (events, failures)
}

/// Writes the line format back out, always column-major.
impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerEvent::Frame(frame) => {
                write!(f, "+FRAME:{},{}", frame.timestamp, frame.yaw)?;
                for entry in frame.transform.as_slice() {
                    write!(f, ",{}", entry)?;
                }
                Ok(())
            }
            TrackerEvent::State(state) => write!(f, "+TRACKING:{}", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::translation;
    use nalgebra::Vector3;

    #[test]
    fn test_frame() {
        let s = "+FRAME:15869.25,0.5,1,0,0,0,0,1,0,0,0,0,1,0,1.5,-2,3.25,1";

        let event = TrackerEvent::decode(s, MatrixLayout::ColumnMajor).unwrap();

        match event {
            TrackerEvent::Frame(frame) => {
                assert_eq!(frame.timestamp, 15869.25);
                assert_eq!(frame.yaw, 0.5);
                assert_eq!(translation(&frame.transform), (1.5, -2.0, 3.25));
            }
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_row_major() {
        let s = "+FRAME:1,0,1,0,0,7,0,1,0,8,0,0,1,9,0,0,0,1";

        let event = TrackerEvent::decode(s, MatrixLayout::RowMajor).unwrap();

        match event {
            TrackerEvent::Frame(frame) => {
                assert_eq!(translation(&frame.transform), (7.0, 8.0, 9.0));
            }
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[test]
    fn test_tracking_states() {
        let cases = [
            ("+TRACKING:NORMAL", CameraTrackingState::Normal),
            ("+TRACKING:NOT_AVAILABLE", CameraTrackingState::NotAvailable),
            (
                "+TRACKING:LIMITED:INITIALIZING",
                CameraTrackingState::Limited(LimitedReason::Initializing),
            ),
            (
                "+TRACKING:LIMITED:INSUFFICIENT_FEATURES",
                CameraTrackingState::Limited(LimitedReason::InsufficientFeatures),
            ),
            (
                "+TRACKING:LIMITED:EXCESSIVE_MOTION",
                CameraTrackingState::Limited(LimitedReason::ExcessiveMotion),
            ),
            (
                "+TRACKING:LIMITED:RELOCALIZING\r\n",
                CameraTrackingState::Limited(LimitedReason::Relocalizing),
            ),
        ];

        for (line, state) in cases {
            assert_eq!(
                TrackerEvent::decode(line, MatrixLayout::ColumnMajor).unwrap(),
                TrackerEvent::State(state)
            );
        }
    }

    #[test]
    fn test_short_frame_is_rejected() {
        let s = "+FRAME:1,0,1,0,0,0,0,1,0,0,0,0,1,0,1,2,3";
        assert!(TrackerEvent::decode(s, MatrixLayout::ColumnMajor).is_err());
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let s = "+TRACKING:NORMAL,extra";
        assert!(TrackerEvent::decode(s, MatrixLayout::ColumnMajor).is_err());
    }

    #[test]
    fn test_session_skips_comments_and_reports_bad_lines() {
        let text = "# recorded session\n\
                    +TRACKING:LIMITED:INITIALIZING\n\
                    \n\
                    +TRACKING:SIDEWAYS\n\
                    +TRACKING:NORMAL\n";

        let (events, failures) = decode_session(text, MatrixLayout::ColumnMajor);

        assert_eq!(events.len(), 2);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 4);
    }

    #[test]
    fn test_display_reads_back() {
        let frame = FrameUpdate::from_position_yaw(Vector3::new(0.25, 1.5, -3.0), 1.0, 2.5);
        let written = TrackerEvent::Frame(frame.clone()).to_string();

        let read = TrackerEvent::decode(&written, MatrixLayout::ColumnMajor).unwrap();
        assert_eq!(read, TrackerEvent::Frame(frame));
    }
}

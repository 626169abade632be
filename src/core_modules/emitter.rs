// THEORY:
// The emitter is the only outbound surface of the engine. It serializes one
// line per detected object per frame and writes it to the serial link that
// feeds the motor controller. The link is fire-and-forget: no retry, no
// acknowledgment, no backpressure. A failed write is logged and the next frame
// proceeds as usual.
//
// Two line grammars exist in the field and they are NOT interchangeable:
//
// - **Full**: radians and world-frame state.
//     ball: `<x>,<y>,<x_velocity>,<y_velocity>,<theta>,<confidence>`
//     goal: `<name>,<distance>,<theta>[,<width>,<height>[,<confidence>]]`
// - **Compact**: integer degrees and a pixel count.
//     `BALL,<degrees>,<pixels>` / `GOAL,<degrees>,<pixels>`
//   Compact degrees are measured in raw image axes (y grows downward), so a
//   target below the optical center reads 90 and one above it reads 270. The
//   full grammar's theta uses the y-up convention instead.
//
// Each deployment picks one in its config. `Message` implements both
// `Display` and `FromStr` so the same type serves the controller side.

use crate::core_modules::kinematics::Estimate;
use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const COMPACT_BALL_TAG: &str = "BALL";
const COMPACT_GOAL_TAG: &str = "GOAL";

/// Which line grammar a deployment speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    #[default]
    Full,
    Compact,
}

/// Which optional trailing fields a full-grammar goal line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalFields {
    /// `name,distance,theta`
    Bearing,
    /// `name,distance,theta,width,height`
    Size,
    /// `name,distance,theta,width,height,confidence`
    #[default]
    Full,
}

/// One outbound line, without its newline.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Ball {
        x: f64,
        y: f64,
        x_velocity: f64,
        y_velocity: f64,
        theta: f64,
        confidence: u8,
    },
    Goal {
        name: String,
        distance: f64,
        theta: f64,
        /// Physical (width, height) in centimetres.
        size: Option<(f64, f64)>,
        /// Only present together with `size`.
        confidence: Option<u8>,
    },
    CompactBall {
        degrees: u16,
        pixels: u32,
    },
    CompactGoal {
        degrees: u16,
        pixels: u32,
    },
}

/// Bearing in whole degrees, wrapped into [0, 360).
pub fn whole_degrees(theta: f64) -> u16 {
    (theta.to_degrees().round() as i64).rem_euclid(360) as u16
}

/// Compact-grammar degrees for a y-up bearing: the same angle measured with
/// image y pointing down.
pub fn compact_degrees(theta: f64) -> u16 {
    whole_degrees(-theta)
}

impl Message {
    /// The ball line for this frame.
    ///
    /// The full grammar carries velocity, so nothing is sent until the track
    /// has a previous fix to difference against.
    pub fn ball(grammar: Grammar, estimate: &Estimate, confidence: u8, pixels: u32) -> Option<Self> {
        match grammar {
            Grammar::Full => {
                let velocity = estimate.velocity?;
                Some(Message::Ball {
                    x: estimate.position.x,
                    y: estimate.position.y,
                    x_velocity: velocity.x,
                    y_velocity: velocity.y,
                    theta: estimate.theta,
                    confidence,
                })
            }
            Grammar::Compact => Some(Message::CompactBall {
                degrees: compact_degrees(estimate.theta),
                pixels,
            }),
        }
    }

    /// The goal line for this frame.
    pub fn goal(
        grammar: Grammar,
        fields: GoalFields,
        name: &str,
        estimate: &Estimate,
        confidence: u8,
        pixels: u32,
    ) -> Self {
        match grammar {
            Grammar::Full => {
                let size = match fields {
                    GoalFields::Bearing => None,
                    GoalFields::Size | GoalFields::Full => Some((estimate.width_cm, estimate.height_cm)),
                };
                Message::Goal {
                    name: name.to_string(),
                    distance: estimate.distance_cm,
                    theta: estimate.theta,
                    size,
                    confidence: (fields == GoalFields::Full).then_some(confidence),
                }
            }
            Grammar::Compact => Message::CompactGoal {
                degrees: compact_degrees(estimate.theta),
                pixels,
            },
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Ball {
                x,
                y,
                x_velocity,
                y_velocity,
                theta,
                confidence,
            } => write!(f, "{x},{y},{x_velocity},{y_velocity},{theta},{confidence}"),
            Message::Goal {
                name,
                distance,
                theta,
                size,
                confidence,
            } => {
                write!(f, "{name},{distance},{theta}")?;
                if let Some((width, height)) = size {
                    write!(f, ",{width},{height}")?;
                    if let Some(confidence) = confidence {
                        write!(f, ",{confidence}")?;
                    }
                }
                Ok(())
            }
            Message::CompactBall { degrees, pixels } => write!(f, "{COMPACT_BALL_TAG},{degrees},{pixels}"),
            Message::CompactGoal { degrees, pixels } => write!(f, "{COMPACT_GOAL_TAG},{degrees},{pixels}"),
        }
    }
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &'static str) -> Result<T, FrameError> {
    fields[index].trim().parse().map_err(|_| FrameError::Field {
        index,
        name,
        value: fields[index].to_string(),
    })
}

impl FromStr for Message {
    type Err = FrameError;

    /// Parses one line of either grammar. A trailing newline is ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split(',').collect();
        let head = fields[0].trim();

        if head == COMPACT_BALL_TAG || head == COMPACT_GOAL_TAG {
            if fields.len() != 3 {
                return Err(FrameError::Malformed(line.to_string()));
            }
            let degrees = field(&fields, 1, "degrees")?;
            let pixels = field(&fields, 2, "pixels")?;
            return Ok(if head == COMPACT_BALL_TAG {
                Message::CompactBall { degrees, pixels }
            } else {
                Message::CompactGoal { degrees, pixels }
            });
        }

        if head.parse::<f64>().is_ok() {
            if fields.len() != 6 {
                return Err(FrameError::Malformed(line.to_string()));
            }
            return Ok(Message::Ball {
                x: field(&fields, 0, "x")?,
                y: field(&fields, 1, "y")?,
                x_velocity: field(&fields, 2, "x_velocity")?,
                y_velocity: field(&fields, 3, "y_velocity")?,
                theta: field(&fields, 4, "theta")?,
                confidence: field(&fields, 5, "confidence")?,
            });
        }

        if head.is_empty() {
            return Err(FrameError::Malformed(line.to_string()));
        }
        let (size, confidence) = match fields.len() {
            3 => (None, None),
            5 => (Some((field(&fields, 3, "width")?, field(&fields, 4, "height")?)), None),
            6 => (
                Some((field(&fields, 3, "width")?, field(&fields, 4, "height")?)),
                Some(field(&fields, 5, "confidence")?),
            ),
            _ => return Err(FrameError::Malformed(line.to_string())),
        };
        Ok(Message::Goal {
            name: head.to_string(),
            distance: field(&fields, 1, "distance")?,
            theta: field(&fields, 2, "theta")?,
            size,
            confidence,
        })
    }
}

/// Writes message lines to a serial link (or anything else that accepts bytes).
pub struct MessageEmitter<W> {
    writer: W,
    lines_written: u64,
    write_failures: u64,
}

impl<W: AsyncWrite + Unpin> MessageEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
            write_failures: 0,
        }
    }

    /// Writes one newline-terminated line.
    pub async fn emit(&mut self, message: &Message) -> std::io::Result<()> {
        let line = format!("{message}\n");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        self.lines_written += 1;
        Ok(())
    }

    /// Writes every message, logging and skipping any that fail.
    pub async fn emit_all(&mut self, messages: &[Message]) {
        for message in messages {
            if let Err(e) = self.emit(message).await {
                self.write_failures += 1;
                log::warn!("serial write failed, dropping line {:?}: {}", message.to_string(), e);
            }
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::kinematics::{Velocity, WorldPosition};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts every line except goal lines, which fail as if the link dropped.
    #[derive(Default)]
    struct FlakyLink {
        written: Vec<u8>,
    }

    impl AsyncWrite for FlakyLink {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            if buf.starts_with(COMPACT_GOAL_TAG.as_bytes()) {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down")));
            }
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn estimate(velocity: Option<Velocity>) -> Estimate {
        Estimate {
            distance_cm: 55.2,
            theta: 1.047,
            width_cm: 12.0,
            height_cm: 6.0,
            position: WorldPosition::new(27.6, 47.8),
            velocity,
        }
    }

    #[test]
    fn full_ball_needs_velocity() {
        assert!(Message::ball(Grammar::Full, &estimate(None), 90, 120).is_none());
        let msg = Message::ball(Grammar::Full, &estimate(Some(Velocity { x: -400.0, y: 400.0 })), 90, 120)
            .expect("velocity present");
        assert_eq!(msg.to_string(), "27.6,47.8,-400,400,1.047,90");
    }

    #[test]
    fn compact_ball_is_sent_without_velocity() {
        let msg = Message::ball(Grammar::Compact, &estimate(None), 90, 120).expect("compact always sends");
        assert_eq!(msg.to_string(), "BALL,300,120");
    }

    #[test]
    fn goal_field_sets() {
        let est = estimate(None);
        let bearing = Message::goal(Grammar::Full, GoalFields::Bearing, "blue", &est, 81, 0);
        assert_eq!(bearing.to_string(), "blue,55.2,1.047");
        let size = Message::goal(Grammar::Full, GoalFields::Size, "blue", &est, 81, 0);
        assert_eq!(size.to_string(), "blue,55.2,1.047,12,6");
        let full = Message::goal(Grammar::Full, GoalFields::Full, "yellow", &est, 81, 0);
        assert_eq!(full.to_string(), "yellow,55.2,1.047,12,6,81");
        let compact = Message::goal(Grammar::Compact, GoalFields::Full, "yellow", &est, 81, 640);
        assert_eq!(compact.to_string(), "GOAL,300,640");
    }

    #[test]
    fn whole_degrees_wraps() {
        assert_eq!(whole_degrees(0.0), 0);
        assert_eq!(whole_degrees(std::f64::consts::TAU - 1e-6), 0);
        assert_eq!(whole_degrees(std::f64::consts::PI), 180);
    }

    #[test]
    fn compact_degrees_use_image_axes() {
        use std::f64::consts::{FRAC_PI_2, PI};
        assert_eq!(compact_degrees(0.0), 0);
        assert_eq!(compact_degrees(PI), 180);
        // Above center in y-up terms is 270 in image terms, and vice versa.
        assert_eq!(compact_degrees(FRAC_PI_2), 270);
        assert_eq!(compact_degrees(3.0 * FRAC_PI_2), 90);
    }

    #[test]
    fn parses_each_line_shape() {
        assert_eq!(
            "GOAL,271,88\n".parse::<Message>().expect("compact goal"),
            Message::CompactGoal { degrees: 271, pixels: 88 }
        );
        assert!(matches!(
            "1.5,-2,3,4,0.25,77".parse::<Message>().expect("ball"),
            Message::Ball { confidence: 77, .. }
        ));
        assert!(matches!(
            "blue,40.1,3.0".parse::<Message>().expect("short goal"),
            Message::Goal { size: None, confidence: None, .. }
        ));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!("".parse::<Message>().is_err());
        assert!("blue,40.1".parse::<Message>().is_err());
        assert!("1,2,3".parse::<Message>().is_err());
        assert!("BALL,12".parse::<Message>().is_err());
        assert!(matches!(
            "blue,far,1.0".parse::<Message>(),
            Err(FrameError::Field { index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn emitter_writes_newline_terminated_lines() {
        let mut emitter = MessageEmitter::new(Vec::new());
        let messages = vec![
            Message::CompactBall { degrees: 12, pixels: 30 },
            Message::CompactGoal { degrees: 200, pixels: 900 },
        ];
        emitter.emit_all(&messages).await;
        assert_eq!(emitter.lines_written(), 2);
        assert_eq!(emitter.write_failures(), 0);
        let bytes = emitter.into_inner();
        assert_eq!(String::from_utf8(bytes).expect("ascii"), "BALL,12,30\nGOAL,200,900\n");
    }

    #[tokio::test]
    async fn failed_write_is_counted_and_later_lines_still_go_out() {
        let mut emitter = MessageEmitter::new(FlakyLink::default());
        let messages = vec![
            Message::CompactBall { degrees: 1, pixels: 2 },
            Message::CompactGoal { degrees: 180, pixels: 900 },
            Message::CompactBall { degrees: 3, pixels: 4 },
        ];
        emitter.emit_all(&messages).await;
        assert_eq!(emitter.write_failures(), 1);
        assert_eq!(emitter.lines_written(), 2);
        let link = emitter.into_inner();
        assert_eq!(String::from_utf8(link.written).expect("ascii"), "BALL,1,2\nBALL,3,4\n");
    }
}

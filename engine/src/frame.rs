//! Feed wire framing.
//!
//! A feed sends each change-set as a sequence of JSON messages:
//!
//! ```text
//! {"frame":"start","id":"cs-1","isCacheImage":false,"numPuts":2,"numRemoves":1}
//! {"id":"A_1","type":"TypeA","content":{...}}     <- numPuts put messages
//! {"id":"A_2","type":"TypeA","content":{...}}
//! {"id":"B1"}                                     <- numRemoves remove messages
//! {"frame":"end","id":"cs-1"}
//! ```
//!
//! A frame flagged as a cache image carries the full feed contents. Consumers
//! clear their projection before applying it.

use crate::{error::Result, ChangeSet, Error, Record, RemovalRequest};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Header of a framed change-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStart {
    pub id: String,
    pub is_cache_image: bool,
    pub num_puts: usize,
    pub num_removes: usize,
}

/// Trailer of a framed change-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEnd {
    pub id: String,
}

/// Frame boundary markers, tagged by the `frame` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "lowercase")]
pub enum FrameMarker {
    Start(FrameStart),
    End(FrameEnd),
}

/// A single message of the feed stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeedMessage {
    Frame(FrameMarker),
    Put(Record),
    Remove(RemovalRequest),
}

impl FeedMessage {
    /// Classify and decode a JSON message.
    ///
    /// Messages with a `frame` key are boundaries, messages with a `type` key
    /// are puts, and anything else must be a remove.
    pub fn from_json(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::InvalidMessage(format!(
                "expected a JSON object, got {value}"
            )));
        };
        let is_frame = object.contains_key("frame");
        let is_put = object.contains_key("type");

        let message = if is_frame {
            serde_json::from_value(value).map(FeedMessage::Frame)
        } else if is_put {
            serde_json::from_value(value).map(FeedMessage::Put)
        } else {
            serde_json::from_value(value).map(FeedMessage::Remove)
        };

        message.map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    /// Parse a text message.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::InvalidMessage(e.to_string()))?;
        Self::from_json(value)
    }

    /// Short name of the message kind, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedMessage::Frame(FrameMarker::Start(_)) => "start",
            FeedMessage::Frame(FrameMarker::End(_)) => "end",
            FeedMessage::Put(_) => "put",
            FeedMessage::Remove(_) => "remove",
        }
    }
}

impl<'de> Deserialize<'de> for FeedMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FeedMessage::from_json(value).map_err(serde::de::Error::custom)
    }
}

/// Turn a change-set into its framed message sequence.
pub fn encode_frame(
    id: impl Into<String>,
    is_cache_image: bool,
    changes: &ChangeSet,
) -> Vec<FeedMessage> {
    let id = id.into();
    let mut messages = Vec::with_capacity(changes.len() + 2);

    messages.push(FeedMessage::Frame(FrameMarker::Start(FrameStart {
        id: id.clone(),
        is_cache_image,
        num_puts: changes.puts.len(),
        num_removes: changes.removes.len(),
    })));
    messages.extend(changes.puts.iter().cloned().map(FeedMessage::Put));
    messages.extend(changes.removes.iter().cloned().map(FeedMessage::Remove));
    messages.push(FeedMessage::Frame(FrameMarker::End(FrameEnd { id })));

    messages
}

/// A complete change-set reassembled from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFrame {
    pub id: String,
    pub is_cache_image: bool,
    pub changes: ChangeSet,
}

#[derive(Debug)]
struct OpenFrame {
    start: FrameStart,
    changes: ChangeSet,
}

/// Stateful assembler of feed messages into change-sets.
///
/// Not thread-safe; use one per feed connection. Any sequencing error drops
/// the frame in progress, so the next message must be a new `start`.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    open: Option<OpenFrame>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame is currently being assembled.
    pub fn in_frame(&self) -> bool {
        self.open.is_some()
    }

    /// Drop any frame in progress.
    pub fn reset(&mut self) {
        self.open = None;
    }

    /// Feed the next message. Returns the change-set once its `end` arrives.
    pub fn push(&mut self, message: FeedMessage) -> Result<Option<AssembledFrame>> {
        let result = self.step(message);
        if result.is_err() {
            self.open = None;
        }
        result
    }

    fn step(&mut self, message: FeedMessage) -> Result<Option<AssembledFrame>> {
        match &mut self.open {
            None => match message {
                FeedMessage::Frame(FrameMarker::Start(start)) => {
                    let changes = ChangeSet {
                        puts: Vec::with_capacity(start.num_puts),
                        removes: Vec::with_capacity(start.num_removes),
                    };
                    self.open = Some(OpenFrame { start, changes });
                    Ok(None)
                }
                other => Err(Error::UnexpectedFrame {
                    got: other.kind().to_string(),
                    state: "no frame is open".to_string(),
                }),
            },
            Some(frame) => match message {
                FeedMessage::Frame(FrameMarker::Start(_)) => Err(Error::UnexpectedFrame {
                    got: "start".to_string(),
                    state: format!("frame {} is open", frame.start.id),
                }),
                FeedMessage::Put(record) => {
                    if !frame.changes.removes.is_empty() {
                        return Err(Error::UnexpectedFrame {
                            got: "put".to_string(),
                            state: format!("frame {} is receiving removes", frame.start.id),
                        });
                    }
                    if frame.changes.puts.len() >= frame.start.num_puts {
                        return Err(Error::FrameOverflow {
                            id: frame.start.id.clone(),
                            kind: "puts".to_string(),
                            announced: frame.start.num_puts,
                        });
                    }
                    frame.changes.puts.push(record);
                    Ok(None)
                }
                FeedMessage::Remove(remove) => {
                    if frame.changes.removes.len() >= frame.start.num_removes {
                        return Err(Error::FrameOverflow {
                            id: frame.start.id.clone(),
                            kind: "removes".to_string(),
                            announced: frame.start.num_removes,
                        });
                    }
                    frame.changes.removes.push(remove);
                    Ok(None)
                }
                FeedMessage::Frame(FrameMarker::End(end)) => {
                    if end.id != frame.start.id {
                        return Err(Error::FrameIdMismatch {
                            expected: frame.start.id.clone(),
                            actual: end.id,
                        });
                    }
                    if frame.changes.puts.len() != frame.start.num_puts
                        || frame.changes.removes.len() != frame.start.num_removes
                    {
                        return Err(Error::IncompleteFrame {
                            id: end.id,
                            puts: frame.changes.puts.len(),
                            num_puts: frame.start.num_puts,
                            removes: frame.changes.removes.len(),
                            num_removes: frame.start.num_removes,
                        });
                    }
                    Ok(self.open.take().map(|frame| AssembledFrame {
                        id: frame.start.id,
                        is_cache_image: frame.start.is_cache_image,
                        changes: frame.changes,
                    }))
                }
            },
        }
    }
}

use serde::Deserialize;
use vigil_core::FrameEvent;

/// Control message interleaved with frames on the input stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Reset,
    SetActive { active: bool },
}

/// One line of daemon input: either a control command or a trace frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputLine {
    Command(Command),
    Frame(FrameEvent),
}

impl InputLine {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

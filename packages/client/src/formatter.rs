//! Frame formatting for client display.

use hiroba_shared::protocol::{ChatFrame, PresenceFrame, ServerFrame};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format any frame pushed by the server.
    ///
    /// `own_key` is this client's key (`user{id}`), marked "(me)" in member lists.
    pub fn format_frame(frame: &ServerFrame, own_key: &str) -> String {
        match frame {
            ServerFrame::Connect(presence) => Self::format_presence('+', presence, own_key),
            ServerFrame::Disconnect(presence) => Self::format_presence('-', presence, own_key),
            ServerFrame::UserMessage(chat) => Self::format_chat_message(chat),
        }
    }

    /// Format a join (`+`) or leave (`-`) announcement with the member list
    pub fn format_presence(marker: char, frame: &PresenceFrame, own_key: &str) -> String {
        let mut output = format!("\n{} {} at {}\n", marker, frame.content, frame.datetime);
        output.push_str("Members:");
        if frame.members.is_empty() {
            output.push_str(" (nobody)\n");
            return output;
        }
        output.push('\n');
        for (key, name) in &frame.members {
            let me_suffix = if key == own_key { " (me)" } else { "" };
            output.push_str(&format!("  {}{}\n", name, me_suffix));
        }
        output
    }

    /// Format a relayed chat message
    pub fn format_chat_message(frame: &ChatFrame) -> String {
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            frame.username, frame.content, frame.datetime
        )
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

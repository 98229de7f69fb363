//! UI utilities for the client.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// Prompt shown to `user_id` in `room_id`
pub fn prompt_for(room_id: i64, user_id: i64) -> String {
    format!("user{}@room{}> ", user_id, room_id)
}

/// Redisplay the prompt after printing a frame
pub fn redisplay_prompt(prompt: &str) {
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}

/// Spawn the readline thread and return the channel of entered lines.
///
/// The channel closes when the user presses Ctrl+C or Ctrl+D. One reader
/// serves every session of a client run, so no line is read by a thread
/// whose session already ended.
pub fn spawn_input_reader(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    // Blocking thread for rustyline (synchronous readline)
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_for() {
        // テスト項目: プロンプトにユーザーとルームが表示される
        // given (前提条件):
        let (room_id, user_id) = (7, 2);

        // when (操作):
        let prompt = prompt_for(room_id, user_id);

        // then (期待する結果):
        assert_eq!(prompt, "user2@room7> ");
    }
}

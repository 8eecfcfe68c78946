use aether_agent::runtime::TurnOutcome;
use aether_chat::blocks::{error_message, help_message, starter_prompts_message, MessageBuilder};
use aether_core::domain::message::ChatRole;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::bootstrap::Application;

const PROMPT: &str = "you> ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Continue(String),
    Quit(String),
}

/// Greeting plus, while no question has been asked, the numbered starters.
pub fn intro(app: &Application) -> String {
    let mut output = String::new();
    for message in app.runtime.transcript().messages() {
        output.push_str(&paint_message(app, message.role, &message.content));
    }
    if let Some(prompts) = app.runtime.starter_prompts() {
        output.push('\n');
        output.push_str(&app.painter.paint(&starter_prompts_message(prompts)));
    }
    output
}

pub async fn process_line(app: &mut Application, line: &str) -> LineOutcome {
    match line.trim() {
        "/quit" | "/exit" => return LineOutcome::Quit("Goodbye!".to_string()),
        "/help" => return LineOutcome::Continue(app.painter.paint(&help_message())),
        "/history" => return LineOutcome::Continue(history(app)),
        command if command.starts_with('/') => {
            return LineOutcome::Continue(format!("Unknown command `{command}`. Type /help."));
        }
        _ => {}
    }

    let output = match app.runtime.handle_turn(line).await {
        Ok(TurnOutcome::Ignored) => String::new(),
        Ok(TurnOutcome::Replied { reply, notice, .. }) => {
            let mut output = String::new();
            if let Some(notice) = notice {
                let message = MessageBuilder::new(notice.clone())
                    .context("chat.guardrail.notice.v1", |context| {
                        context.plain(notice);
                    })
                    .build();
                output.push_str(&app.painter.paint(&message));
            }
            output.push_str(&paint_message(app, ChatRole::Assistant, &reply));
            output
        }
        Err(error) => {
            app.painter.paint(&error_message(error.user_message(), error.correlation_id()))
        }
    };

    LineOutcome::Continue(output)
}

pub async fn run(app: &mut Application) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    print!("{}", intro(app));

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(error) = editor.add_history_entry(line.as_str()) {
                    debug!(
                        event_name = "cli.chat.history_entry_failed",
                        correlation_id = "chat",
                        error = %error,
                        "could not record line in editor history"
                    );
                }

                match process_line(app, &line).await {
                    LineOutcome::Continue(output) => print!("{output}"),
                    LineOutcome::Quit(output) => {
                        println!("{output}");
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(error) => return Err(error.into()),
        }
    }

    Ok(())
}

fn history(app: &Application) -> String {
    app.runtime
        .transcript()
        .messages()
        .iter()
        .map(|message| paint_message(app, message.role, &message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn paint_message(app: &Application, role: ChatRole, content: &str) -> String {
    match role {
        ChatRole::User => {
            let message = MessageBuilder::new(content)
                .narrative("chat.user.text.v1", |narrative| {
                    narrative.plain(content);
                })
                .build();
            app.painter.paint_turn("You", &message)
        }
        ChatRole::Assistant => app.painter.paint_turn("Assistant", &app.renderer.render(content)),
    }
}

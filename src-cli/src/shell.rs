//! Interactive page loop
//!
//! Prompts run as their own tasks so a slow reply never blocks the input
//! line; replies print in completion order. All tasks of a page are aborted
//! when the page unloads.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use simplechat_core::{Page, PageState, Redirect, SubmitOutcome};

use crate::commands::input::{Command, Input};
use crate::commands::{navigation, render};
use crate::state::AppState;

/// A finished submission, tagged with the page it belongs to
struct Completion {
    generation: u64,
    outcome: SubmitOutcome,
}

enum PageExit {
    Navigate(Redirect),
    Quit,
}

pub struct Shell {
    state: AppState,
    lines: Lines<BufReader<Stdin>>,
    tasks: JoinSet<()>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Shell {
    pub fn new(state: AppState) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            state,
            lines: BufReader::new(tokio::io::stdin()).lines(),
            tasks: JoinSet::new(),
            completions_tx,
            completions_rx,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            let page = self.state.page();
            render::page(&PageState::Loading);
            let state = page.load().await;
            render::page(&state);

            match self.page_loop(&page).await? {
                PageExit::Navigate(redirect) => {
                    self.navigate(redirect).await;
                    self.state.reload();
                }
                PageExit::Quit => break,
            }
        }

        self.tasks.shutdown().await;
        Ok(())
    }

    async fn page_loop(&mut self, page: &Arc<Page>) -> anyhow::Result<PageExit> {
        let generation = self.state.generation();

        loop {
            tokio::select! {
                line = self.lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(PageExit::Quit);
                    };
                    if let Some(exit) = self.handle_input(page, generation, &line).await {
                        return Ok(exit);
                    }
                }
                Some(completion) = self.completions_rx.recv() => {
                    if completion.generation != generation {
                        continue;
                    }
                    match completion.outcome {
                        SubmitOutcome::Replied(message) | SubmitOutcome::Failed(message) => {
                            render::message(&message);
                        }
                        SubmitOutcome::Rejected => {}
                        SubmitOutcome::Redirect(redirect) => return Ok(PageExit::Navigate(redirect)),
                    }
                }
                Some(joined) = self.tasks.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Submission task panicked");
                        }
                    }
                }
            }
        }
    }

    async fn handle_input(&mut self, page: &Page, generation: u64, line: &str) -> Option<PageExit> {
        match Input::parse(line) {
            Input::Empty => None,
            Input::Prompt(prompt) => {
                match page.chat() {
                    Some(chat) => {
                        chat.set_input(&prompt);
                        let submission = chat.submit_input();
                        let tx = self.completions_tx.clone();
                        self.tasks.spawn(async move {
                            let outcome = submission.await;
                            let _ = tx.send(Completion { generation, outcome });
                        });
                    }
                    None => render::page(&page.state()),
                }
                None
            }
            Input::Command(Command::Login) => match page.state() {
                PageState::SignedOut => match page.login().await {
                    Ok(redirect) => Some(PageExit::Navigate(redirect)),
                    Err(e) => {
                        render::notice(&format!("Sign-in could not start: {e}"));
                        None
                    }
                },
                state => {
                    render::page(&state);
                    None
                }
            },
            Input::Command(Command::Logout) => match page.state() {
                PageState::SignedIn { .. } => match page.logout().await {
                    Ok(redirect) => Some(PageExit::Navigate(redirect)),
                    Err(e) => {
                        render::notice(&format!("Sign-out failed: {e}"));
                        None
                    }
                },
                state => {
                    render::page(&state);
                    None
                }
            },
            Input::Command(Command::WhoAmI) => {
                match page.state().account() {
                    Some(account) => render::notice(&format!(
                        "{} ({})",
                        render::format_account(account),
                        account.home_account_id
                    )),
                    None => render::notice("Not signed in."),
                }
                None
            }
            Input::Command(Command::Transcript) => {
                match page.chat() {
                    Some(chat) => render::transcript(&chat.transcript().messages()),
                    None => render::page(&page.state()),
                }
                None
            }
            Input::Command(Command::Help) => {
                render::notice(render::HELP);
                None
            }
            Input::Command(Command::Quit) => Some(PageExit::Quit),
            Input::Command(Command::Unknown(name)) => {
                render::notice(&format!("Unknown command /{name}. Type /help."));
                None
            }
        }
    }

    /// Leave the current page for `redirect`
    async fn navigate(&mut self, redirect: Redirect) {
        // The page is unloading; its pending prompts go with it
        self.tasks.abort_all();

        render::redirect(&redirect);

        if redirect.kind().expects_response() {
            let Some(redirect_uri) = self.state.entra().redirect_uri() else {
                return;
            };
            match navigation::capture_redirect(&redirect_uri, &mut self.lines).await {
                Ok(Some(location)) => self.state.entra().receive_redirect(location),
                Ok(None) => render::notice("No sign-in response received."),
                Err(e) => {
                    tracing::warn!(error = %e, "Redirect capture failed");
                    render::notice("No sign-in response received.");
                }
            }
        }
    }
}

//! Terminal output

use simplechat_core::{Account, Message, Origin, PageState, Redirect, RedirectKind};

pub const HELP: &str = "\
Commands:
  /login        sign in
  /logout       sign out
  /whoami       show the signed-in account
  /transcript   show the conversation so far
  /help         show this help
  /quit         exit
Anything else is sent as a prompt. Start a prompt with // to send a leading slash.";

pub fn format_message(message: &Message) -> String {
    let speaker = match message.origin() {
        Origin::User => "you",
        Origin::Assistant => "bot",
    };
    format!("{speaker}> {}", message.text())
}

pub fn format_account(account: &Account) -> String {
    if account.username.is_empty() {
        account.display_name().to_string()
    } else {
        account.username.clone()
    }
}

pub fn format_page(state: &PageState) -> String {
    match state {
        PageState::Loading => "Initializing sign-in...".to_string(),
        PageState::Failed(error) => format!(
            "Sign-in is unavailable: {}\nFix the configuration and restart SimpleChat.",
            error.reason
        ),
        PageState::SignedOut => "You need to sign in to send messages. Type /login.".to_string(),
        PageState::SignedIn { session, .. } => match session.account() {
            Some(account) => format!("Signed in as {}. Type a message, or /help.", format_account(account)),
            None => "Signed in. Type a message, or /help.".to_string(),
        },
    }
}

pub fn format_redirect(redirect: &Redirect) -> String {
    let action = match redirect.kind() {
        RedirectKind::Login => "sign in",
        RedirectKind::Consent => "grant access to the chat service",
        RedirectKind::Logout => "finish signing out",
    };
    format!("Open this address in your browser to {action}:\n  {}", redirect.url())
}

pub fn page(state: &PageState) {
    println!("{}", format_page(state));
}

pub fn message(message: &Message) {
    println!("{}", format_message(message));
}

pub fn transcript(messages: &[Message]) {
    if messages.is_empty() {
        println!("(no messages yet)");
    }
    for m in messages {
        message(m);
    }
}

pub fn redirect(redirect: &Redirect) {
    println!("{}", format_redirect(redirect));
}

pub fn notice(text: &str) {
    println!("{text}");
}

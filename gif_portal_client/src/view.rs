//! Text rendering of the portal state.

use std::fmt::Write;

use crate::app::{AccountState, AppContext, UiBranch};

pub const CONNECT_PROMPT: &str = "Connect to Wallet";
pub const INITIALIZE_PROMPT: &str = "Do One-Time Initialize For GIF Program Account";
pub const INPUT_PLACEHOLDER: &str = "Enter gif link";

pub fn render(context: &AppContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🖼  GIF Portal");
    let _ = writeln!(out, "   View your GIF collection in the metaverse ✨");
    let _ = writeln!(out);

    match context.branch() {
        UiBranch::NotConnected => {
            let _ = writeln!(out, "[ {CONNECT_PROMPT} ]");
        }
        UiBranch::ConnectedUnknown => {
            let _ = writeln!(out, "Loading GIFs...");
        }
        UiBranch::ConnectedUninitialized => {
            if let AccountState::Unreachable(reason) = &context.account {
                let _ = writeln!(out, "⚠️  Could not load the GIF account: {reason}");
            }
            let _ = writeln!(out, "[ {INITIALIZE_PROMPT} ]");
        }
        UiBranch::ConnectedReady => {
            let input = if context.input.is_empty() {
                INPUT_PLACEHOLDER
            } else {
                context.input.as_str()
            };
            let _ = writeln!(out, "> {input}  [ Submit ]");
            let _ = writeln!(out);
            let entries = context.entries().unwrap_or_default();
            if entries.is_empty() {
                let _ = writeln!(out, "No GIFs yet.");
            }
            for (i, entry) in entries.iter().enumerate() {
                let _ = writeln!(out, "{:>3}. {}", i + 1, entry.gif_link);
                let _ = writeln!(out, "     by {}", entry.user_address);
            }
        }
    }

    if let Some(address) = context.session.wallet_address {
        let _ = writeln!(out);
        let _ = writeln!(out, "wallet: {address}");
    }
    out
}

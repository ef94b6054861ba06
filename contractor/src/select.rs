//! Interactive chain and account selection.
//!
//! Input is read through the [`Prompt`] trait so the selection rules can be
//! driven without a terminal. [`TerminalPrompt`] is the interactive
//! implementation used by the CLI.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::time::Duration;

use alloy_primitives::Address;

use crate::error::Error;
use crate::web3::Web3;

/// Source of user answers.
pub trait Prompt {
    /// Shows `message` and reads one line. An empty answer yields `default`
    /// when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the input cannot be read.
    fn prompt(&mut self, message: &str, default: Option<&str>) -> Result<String, Error>;

    /// Shows `message` and reads a line without echoing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the input cannot be read.
    fn prompt_password(&mut self, message: &str) -> Result<String, Error>;
}

/// Prompts on stderr and reads from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn prompt(&mut self, message: &str, default: Option<&str>) -> Result<String, Error> {
        let mut stderr = io::stderr().lock();
        let shown = match default {
            Some(default) => write!(stderr, "{message} [{default}]: "),
            None => write!(stderr, "{message}: "),
        };
        shown
            .and_then(|()| stderr.flush())
            .map_err(|e| Error::io_with("failed to write prompt", e))?;

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(|e| Error::io_with("failed to read answer", e))?;
        let answer = answer.trim();
        Ok(match default {
            Some(default) if answer.is_empty() => default.to_owned(),
            _ => answer.to_owned(),
        })
    }

    fn prompt_password(&mut self, message: &str) -> Result<String, Error> {
        rpassword::prompt_password(format!("{message}: "))
            .map_err(|e| Error::io_with("failed to read password", e))
    }
}

/// Asks the user to pick one of the configured chains.
///
/// Chains are listed alphabetically with numeric shortcuts; either the name
/// or its number is accepted.
///
/// # Errors
///
/// Returns [`Error::Selection`] for any other answer.
pub fn select_chain<'a>(
    chains: impl IntoIterator<Item = &'a str>,
    prompt: &mut dyn Prompt,
) -> Result<String, Error> {
    let options: Vec<&str> = chains.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

    let mut message = String::from("Available Chains\n----------------\n");
    for (index, name) in options.iter().enumerate() {
        message.push_str(&format!("{index} - {name}\n"));
    }
    message.push_str("\nEnter either the name, or number of the desired chain");

    let choice = prompt.prompt(&message, None)?;
    if options.contains(&choice.as_str()) {
        return Ok(choice);
    }
    let index = parse_index(&choice, options.len())?;
    Ok(options[index].to_owned())
}

/// Asks the user to pick one of the node's accounts.
///
/// Every account is listed with its index; unlocked ones are marked.
/// `default` is offered when the answer is left empty.
///
/// # Errors
///
/// Returns [`Error::Selection`] when the node has no accounts or the answer
/// is neither a listed address nor an index in range.
pub fn select_account(
    web3: &dyn Web3,
    default: Option<Address>,
    prompt: &mut dyn Prompt,
) -> Result<Address, Error> {
    let accounts = web3.accounts()?;
    if accounts.is_empty() {
        return Err(Error::Selection("No accounts found on chain.".to_owned()));
    }

    let mut message = String::from("Accounts\n-----------------\n");
    for (index, account) in accounts.iter().enumerate() {
        let marker = if web3.is_account_locked(*account)? {
            ""
        } else {
            " (unlocked)"
        };
        message.push_str(&format!("{index} - {account}{marker}\n"));
    }
    message.push_str("\nEnter the account address or the number of the desired account");

    let default = default.map(|account| account.to_string());
    let choice = prompt.prompt(&message, default.as_deref())?;
    if let Ok(address) = choice.parse::<Address>() {
        if accounts.contains(&address) {
            return Ok(address);
        }
    }
    let index = parse_index(&choice, accounts.len())?;
    Ok(accounts[index])
}

/// Unlocks `account` with a password read from `prompt`.
///
/// # Errors
///
/// Returns [`Error::AccountLocked`] if the account is already unlocked or
/// the node refuses the password.
pub fn request_account_unlock(
    web3: &dyn Web3,
    account: Address,
    duration: Duration,
    prompt: &mut dyn Prompt,
) -> Result<(), Error> {
    if !web3.is_account_locked(account)? {
        return Err(Error::AccountLocked(format!(
            "The account `{account}` is already unlocked"
        )));
    }
    let password = prompt.prompt_password(&format!(
        "Please provide the password to unlock account `{account}`."
    ))?;
    if !web3.unlock_account(account, &password, duration)? {
        return Err(Error::AccountLocked(format!(
            "Unable to unlock account: `{account}`"
        )));
    }
    tracing::info!(%account, ?duration, "account unlocked");
    Ok(())
}

/// Picks the sending account and makes sure it is unlocked.
///
/// An `explicit` account is used as is. Otherwise the account picker is
/// shown with `default` offered for an empty answer. A locked account is
/// unlocked for `unlock_duration` with a password prompt.
///
/// # Errors
///
/// Propagates selection and unlock failures.
pub fn select_sender(
    web3: &dyn Web3,
    explicit: Option<Address>,
    default: Option<Address>,
    unlock_duration: Duration,
    prompt: &mut dyn Prompt,
) -> Result<Address, Error> {
    let account = match explicit {
        Some(account) => account,
        None => select_account(web3, default, prompt)?,
    };
    if web3.is_account_locked(account)? {
        request_account_unlock(web3, account, unlock_duration, prompt)?;
    }
    Ok(account)
}

/// Parses a numeric shortcut below `len`.
fn parse_index(choice: &str, len: usize) -> Result<usize, Error> {
    Some(choice)
        .filter(|choice| !choice.is_empty() && choice.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|choice| choice.parse::<usize>().ok())
        .filter(|index| *index < len)
        .ok_or_else(|| Error::selection(choice))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::testing::{MockWeb3, PASSWORD};

    #[derive(Debug, Default)]
    struct ScriptedPrompt {
        answers: VecDeque<String>,
        messages: Vec<String>,
    }

    impl ScriptedPrompt {
        fn answering(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|answer| (*answer).to_owned()).collect(),
                messages: Vec::new(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn prompt(&mut self, message: &str, default: Option<&str>) -> Result<String, Error> {
            self.messages.push(message.to_owned());
            let answer = self.answers.pop_front().unwrap_or_default();
            Ok(match default {
                Some(default) if answer.is_empty() => default.to_owned(),
                _ => answer,
            })
        }

        fn prompt_password(&mut self, message: &str) -> Result<String, Error> {
            self.prompt(message, None)
        }
    }

    const A: Address = Address::repeat_byte(0xaa);
    const B: Address = Address::repeat_byte(0xbb);
    const UNLOCK: Duration = Duration::from_secs(60);

    fn node() -> MockWeb3 {
        MockWeb3::default()
            .with_accounts(vec![A, B])
            .with_unlocked(B)
    }

    #[test]
    fn chains_are_listed_alphabetically() {
        let mut prompt = ScriptedPrompt::answering(&["1"]);
        let chosen = select_chain(["ropsten", "local", "mainnet"], &mut prompt).expect("chain");
        assert_eq!(chosen, "mainnet");
        assert!(prompt.messages[0].contains("0 - local\n1 - mainnet\n2 - ropsten"));
    }

    #[test]
    fn chain_can_be_chosen_by_name() {
        let mut prompt = ScriptedPrompt::answering(&["ropsten"]);
        let chosen = select_chain(["ropsten", "local"], &mut prompt).expect("chain");
        assert_eq!(chosen, "ropsten");
    }

    #[test]
    fn out_of_range_chain_index_is_rejected() {
        let mut prompt = ScriptedPrompt::answering(&["2"]);
        let err = select_chain(["ropsten", "local"], &mut prompt).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid choice: 2.  Please choose from one of the provided options."
        );
    }

    #[test]
    fn account_index_selects_account() {
        let mut prompt = ScriptedPrompt::answering(&["1"]);
        let chosen = select_account(&node(), None, &mut prompt).expect("account");
        assert_eq!(chosen, B);
        let listing = &prompt.messages[0];
        assert!(listing.contains(&format!("0 - {A}\n")));
        assert!(listing.contains(&format!("1 - {B} (unlocked)\n")));
    }

    #[test]
    fn unknown_account_choice_is_rejected() {
        let mut prompt = ScriptedPrompt::answering(&["C"]);
        assert!(matches!(
            select_account(&node(), None, &mut prompt),
            Err(Error::Selection(_))
        ));
    }

    #[test]
    fn account_address_and_default_are_accepted() {
        let by_address = A.to_string();
        let mut prompt = ScriptedPrompt::answering(&[by_address.as_str()]);
        assert_eq!(select_account(&node(), None, &mut prompt).expect("by address"), A);

        let mut prompt = ScriptedPrompt::answering(&[""]);
        assert_eq!(
            select_account(&node(), Some(B), &mut prompt).expect("default"),
            B
        );
    }

    #[test]
    fn no_accounts_is_a_selection_error() {
        let web3 = MockWeb3::default().with_accounts(Vec::new());
        let mut prompt = ScriptedPrompt::default();
        assert!(matches!(
            select_account(&web3, None, &mut prompt),
            Err(Error::Selection(ref msg)) if msg == "No accounts found on chain."
        ));
    }

    #[test]
    fn unlocking_an_unlocked_account_fails() {
        let mut prompt = ScriptedPrompt::answering(&[PASSWORD]);
        let err =
            request_account_unlock(&node(), B, Duration::from_secs(60), &mut prompt).unwrap_err();
        assert!(matches!(err, Error::AccountLocked(ref msg) if msg.contains("already unlocked")));
        assert!(prompt.messages.is_empty());
    }

    #[test]
    fn wrong_password_fails_unlock() {
        let mut prompt = ScriptedPrompt::answering(&["hunter2"]);
        let err =
            request_account_unlock(&node(), A, Duration::from_secs(60), &mut prompt).unwrap_err();
        assert!(matches!(err, Error::AccountLocked(ref msg) if msg.starts_with("Unable to unlock")));
    }

    #[test]
    fn correct_password_unlocks() {
        let web3 = node();
        let mut prompt = ScriptedPrompt::answering(&[PASSWORD]);
        request_account_unlock(&web3, A, Duration::from_secs(60), &mut prompt).expect("unlocked");
        assert!(!web3.is_account_locked(A).expect("lock state"));
    }

    #[test]
    fn sender_picker_offers_configured_default() {
        let web3 = node();
        let mut prompt = ScriptedPrompt::answering(&[""]);
        let sender = select_sender(&web3, None, Some(B), UNLOCK, &mut prompt).expect("sender");
        assert_eq!(sender, B);
        assert_eq!(prompt.messages.len(), 1);
        assert!(prompt.messages[0].contains(&format!("0 - {A}\n")));
    }

    #[test]
    fn locked_sender_is_unlocked_after_selection() {
        let web3 = node();
        let mut prompt = ScriptedPrompt::answering(&["0", PASSWORD]);
        let sender = select_sender(&web3, None, Some(B), UNLOCK, &mut prompt).expect("sender");
        assert_eq!(sender, A);
        assert!(!web3.is_account_locked(A).expect("lock state"));
    }

    #[test]
    fn explicit_sender_skips_the_picker() {
        let web3 = node();
        let mut prompt = ScriptedPrompt::default();
        let sender = select_sender(&web3, Some(B), Some(A), UNLOCK, &mut prompt).expect("sender");
        assert_eq!(sender, B);
        assert!(prompt.messages.is_empty());
    }
}

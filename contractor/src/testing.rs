//! Scripted in-memory [`Web3`] used by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use alloy_primitives::{Address, address};

use crate::config::Web3Config;
use crate::error::Error;
use crate::web3::{
    Connector, EMPTY_CODE, Transaction, TransactionReceipt, TransactionRequest, TxHash, Web3,
};

pub const ACCOUNT: Address = address!("0x1111111111111111111111111111111111111111");
pub const DEPLOYED_ADDRESS: Address = address!("0xd3cda913deb6f67967b99d67acdfa1712c293601");
pub const PASSWORD: &str = "correct horse";
pub const TX_HASH: TxHash = TxHash::repeat_byte(0x11);

/// Node fake with one confirmed-on-demand creation transaction.
#[derive(Debug)]
pub struct MockWeb3 {
    accounts: Vec<Address>,
    unlocked: RefCell<HashSet<Address>>,
    codes: RefCell<HashMap<Address, String>>,
    deploy_code: String,
    /// Receipt poll index at which the transaction is mined; `None` never.
    confirm_after: Option<usize>,
    polls: Cell<usize>,
    gas: u64,
    gas_used: u64,
    sent: RefCell<Vec<TransactionRequest>>,
}

impl Default for MockWeb3 {
    fn default() -> Self {
        Self {
            accounts: vec![ACCOUNT],
            unlocked: RefCell::new(HashSet::from([ACCOUNT])),
            codes: RefCell::new(HashMap::new()),
            deploy_code: "0x6060604052600080fd".to_owned(),
            confirm_after: Some(0),
            polls: Cell::new(0),
            gas: 300_000,
            gas_used: 123_456,
            sent: RefCell::new(Vec::new()),
        }
    }
}

impl MockWeb3 {
    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self.unlocked.get_mut().clear();
        self
    }

    pub fn with_unlocked(self, account: Address) -> Self {
        self.unlocked.borrow_mut().insert(account);
        self
    }

    pub fn with_locked(self, account: Address) -> Self {
        self.unlocked.borrow_mut().remove(&account);
        self
    }

    pub fn with_code(self, address: Address, code: &str) -> Self {
        self.codes.borrow_mut().insert(address, code.to_owned());
        self
    }

    pub fn with_deploy_code(mut self, code: &str) -> Self {
        code.clone_into(&mut self.deploy_code);
        self
    }

    pub const fn confirm_after(mut self, polls: Option<usize>) -> Self {
        self.confirm_after = polls;
        self
    }

    pub fn polls(&self) -> usize {
        self.polls.get()
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.sent.borrow().clone()
    }

    fn sent_with(&self, hash: TxHash) -> Option<TransactionRequest> {
        if hash != TX_HASH {
            return None;
        }
        self.sent.borrow().last().cloned()
    }
}

impl Web3 for MockWeb3 {
    fn accounts(&self) -> Result<Vec<Address>, Error> {
        Ok(self.accounts.clone())
    }

    fn coinbase(&self) -> Result<Address, Error> {
        self.accounts
            .first()
            .copied()
            .ok_or_else(|| Error::rpc("no coinbase"))
    }

    fn is_account_locked(&self, account: Address) -> Result<bool, Error> {
        Ok(!self.unlocked.borrow().contains(&account))
    }

    fn unlock_account(
        &self,
        account: Address,
        password: &str,
        _duration: Duration,
    ) -> Result<bool, Error> {
        if password != PASSWORD {
            return Ok(false);
        }
        self.unlocked.borrow_mut().insert(account);
        Ok(true)
    }

    fn send_transaction(&self, transaction: &TransactionRequest) -> Result<TxHash, Error> {
        self.sent.borrow_mut().push(transaction.clone());
        self.codes
            .borrow_mut()
            .insert(DEPLOYED_ADDRESS, self.deploy_code.clone());
        Ok(TX_HASH)
    }

    fn get_transaction(&self, hash: TxHash) -> Result<Option<Transaction>, Error> {
        Ok(self.sent_with(hash).map(|request| Transaction {
            hash,
            from: request.from,
            gas: self.gas,
            block_number: None,
        }))
    }

    fn get_transaction_receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>, Error> {
        if self.sent_with(hash).is_none() {
            return Ok(None);
        }
        let poll = self.polls.get();
        self.polls.set(poll + 1);
        let mined = self.confirm_after.is_some_and(|after| poll >= after);
        Ok(mined.then(|| TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(1),
            gas_used: self.gas_used,
            contract_address: Some(DEPLOYED_ADDRESS),
        }))
    }

    fn get_code(&self, address: Address) -> Result<String, Error> {
        Ok(self
            .codes
            .borrow()
            .get(&address)
            .cloned()
            .unwrap_or_else(|| EMPTY_CODE.to_owned()))
    }
}

/// A connector handing out `web3` and counting how often it is called.
pub fn counting_connector(web3: Rc<MockWeb3>) -> (Connector, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let connector: Connector = Box::new(move |_config: &Web3Config| {
        counter.set(counter.get() + 1);
        Ok(Rc::clone(&web3) as Rc<dyn Web3>)
    });
    (connector, calls)
}

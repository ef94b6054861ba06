//! JSON-RPC over HTTP implementation of [`Web3`].

use std::cell::Cell;
use std::time::Duration;

use alloy_primitives::Address;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use super::{Transaction, TransactionReceipt, TransactionRequest, TxHash, Web3};
use crate::config::Web3Config;
use crate::error::Error;

/// Payload signed when probing whether an account is locked.
const LOCK_PROBE_DATA: &str = "0x73696d706c652d746573742d64617461";

/// Fragment of the node error returned when signing with a locked account.
const LOCKED_ERROR_FRAGMENT: &str = "account is locked";

#[derive(Debug, Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Blocking JSON-RPC client for a single endpoint.
#[derive(Debug)]
pub struct HttpWeb3 {
    client: Client,
    url: Url,
    next_id: Cell<u64>,
}

impl HttpWeb3 {
    /// Creates a client for `url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::rpc_with("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            url,
            next_id: Cell::new(1),
        })
    }

    /// Creates a client from chain web3 settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the RPC URL is invalid or refers
    /// to a missing environment variable.
    pub fn from_config(config: &Web3Config) -> Result<Self, Error> {
        let url = config.endpoint()?;
        tracing::debug!(%url, "connecting to JSON-RPC endpoint");
        Self::new(url, config.request_timeout())
    }

    /// Endpoint this client talks to.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Sends one request; the outer error is transport level, the inner one
    /// is the node's JSON-RPC error object.
    fn exchange<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Result<Option<R>, RpcErrorObject>, Error> {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, "rpc request");

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::rpc_with(format!("{method} failed"), e))?;
        let response: RpcResponse<R> = response
            .json()
            .map_err(|e| Error::rpc_with(format!("{method} returned malformed JSON"), e))?;

        Ok(match response.error {
            Some(error) => Err(error),
            None => Ok(response.result),
        })
    }

    fn request<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<R>, Error> {
        self.exchange(method, params)?.map_err(|error| {
            Error::rpc(format!(
                "{method}: {} (code {})",
                error.message, error.code
            ))
        })
    }

    fn request_some<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, Error> {
        self.request(method, params)?
            .ok_or_else(|| Error::rpc(format!("{method}: empty result")))
    }
}

impl Web3 for HttpWeb3 {
    fn accounts(&self) -> Result<Vec<Address>, Error> {
        self.request_some("eth_accounts", json!([]))
    }

    fn coinbase(&self) -> Result<Address, Error> {
        self.request_some("eth_coinbase", json!([]))
    }

    fn is_account_locked(&self, account: Address) -> Result<bool, Error> {
        match self.exchange::<String>("eth_sign", json!([account, LOCK_PROBE_DATA]))? {
            Ok(_) => Ok(false),
            Err(error) => Ok(error.message.contains(LOCKED_ERROR_FRAGMENT)),
        }
    }

    fn unlock_account(
        &self,
        account: Address,
        password: &str,
        duration: Duration,
    ) -> Result<bool, Error> {
        self.request_some(
            "personal_unlockAccount",
            json!([account, password, duration.as_secs()]),
        )
    }

    fn send_transaction(&self, transaction: &TransactionRequest) -> Result<TxHash, Error> {
        self.request_some("eth_sendTransaction", json!([transaction]))
    }

    fn get_transaction(&self, hash: TxHash) -> Result<Option<Transaction>, Error> {
        self.request("eth_getTransactionByHash", json!([hash]))
    }

    fn get_transaction_receipt(&self, hash: TxHash) -> Result<Option<TransactionReceipt>, Error> {
        self.request("eth_getTransactionReceipt", json!([hash]))
    }

    fn get_code(&self, address: Address) -> Result<String, Error> {
        self.request_some("eth_getCode", json!([address, "latest"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, address};
    use mockito::{Matcher, Server};
    use std::net::TcpListener;

    const ACCOUNT: Address = address!("0x82a978b3f5962a5b0957d9ee9eef472ee55b42f1");

    fn localhost_binding_permitted() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(server: &Server) -> HttpWeb3 {
        let url = Url::parse(&server.url()).expect("server url");
        HttpWeb3::new(url, Duration::from_secs(5)).expect("client")
    }

    fn respond(server: &mut Server, method: &str, body: &str) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create()
    }

    fn decode<R: DeserializeOwned>(body: &str) -> RpcResponse<R> {
        serde_json::from_str(body).expect("rpc response")
    }

    #[test]
    fn responses_decode_for_any_result_type() {
        let ok: RpcResponse<Vec<Address>> = decode(
            r#"{"jsonrpc":"2.0","id":1,"result":["0x82a978b3f5962a5b0957d9ee9eef472ee55b42f1"]}"#,
        );
        assert_eq!(ok.result, Some(vec![ACCOUNT]));
        assert!(ok.error.is_none());

        let failed: RpcResponse<TransactionReceipt> = decode(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#,
        );
        assert!(failed.result.is_none());
        let error = failed.error.expect("error object");
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "method not found");
    }

    #[test]
    fn accounts_are_parsed() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let _m = respond(
            &mut server,
            "eth_accounts",
            r#"{"jsonrpc":"2.0","id":1,"result":["0x82a978b3f5962a5b0957d9ee9eef472ee55b42f1"]}"#,
        );

        let accounts = client(&server).accounts().expect("accounts");
        assert_eq!(accounts, vec![ACCOUNT]);
    }

    #[test]
    fn pending_receipt_is_none() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let _m = respond(
            &mut server,
            "eth_getTransactionReceipt",
            r#"{"jsonrpc":"2.0","id":1,"result":null}"#,
        );

        let receipt = client(&server)
            .get_transaction_receipt(B256::repeat_byte(0xab))
            .expect("receipt");
        assert!(receipt.is_none());
    }

    #[test]
    fn mined_receipt_carries_quantities() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"transactionHash":"{}","blockNumber":"0x10","gasUsed":"0x5208","contractAddress":"0x82a978b3f5962a5b0957d9ee9eef472ee55b42f1"}}}}"#,
            B256::repeat_byte(0xab)
        );
        let _m = respond(&mut server, "eth_getTransactionReceipt", &body);

        let receipt = client(&server)
            .get_transaction_receipt(B256::repeat_byte(0xab))
            .expect("receipt")
            .expect("mined");
        assert!(receipt.is_confirmed());
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.contract_address, Some(ACCOUNT));
    }

    #[test]
    fn node_errors_surface_as_rpc_errors() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let _m = respond(
            &mut server,
            "eth_getCode",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"header not found"}}"#,
        );

        let err = client(&server).get_code(ACCOUNT).unwrap_err();
        assert!(matches!(err, Error::Rpc(ref msg) if msg.contains("header not found")));
    }

    #[test]
    fn locked_account_is_detected_from_sign_error() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let _m = respond(
            &mut server,
            "eth_sign",
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"authentication needed: password or unlock; account is locked"}}"#,
        );

        assert!(client(&server).is_account_locked(ACCOUNT).expect("lock state"));
    }

    #[test]
    fn signing_account_is_unlocked() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let _m = respond(
            &mut server,
            "eth_sign",
            r#"{"jsonrpc":"2.0","id":1,"result":"0xdeadbeef"}"#,
        );

        assert!(!client(&server).is_account_locked(ACCOUNT).expect("lock state"));
    }

    #[test]
    fn send_transaction_posts_creation_request() {
        if !localhost_binding_permitted() {
            return;
        }
        let mut server = Server::new();
        let hash = B256::repeat_byte(0x11);
        let _m = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""method"\s*:\s*"eth_sendTransaction""#.to_owned()),
                Matcher::Regex(r#""data"\s*:\s*"0x6060""#.to_owned()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{hash}"}}"#))
            .create();

        let request = TransactionRequest::create(ACCOUNT, "0x6060".to_owned());
        let sent = client(&server).send_transaction(&request).expect("send");
        assert_eq!(sent, hash);
    }
}

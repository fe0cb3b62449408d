//! Contract ABI codec.
//!
//! Covers exactly what the quiz contract needs: address, uint256, bool,
//! string and address[] tokens, 4-byte selectors and the two events the
//! client listens for. Every decoder is bounds-checked and returns
//! [`QuizError::Decode`] on malformed input.

use crate::domain::{Account, ContractEvent, LogEntry, QuizError, TxReceipt, Wei};
use primitive_types::U256;
use sha3::{Digest, Keccak256};
use tracing::debug;

/// ABI word size.
pub const WORD: usize = 32;

/// Canonical signature of `WinnerDeclared(address indexed winner, uint reward)`.
pub const WINNER_DECLARED: &str = "WinnerDeclared(address,uint256)";

/// Canonical signature of `TournamentEnded(uint)`.
pub const TOURNAMENT_ENDED: &str = "TournamentEnded(uint256)";

/// An ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Account),
    /// `uint256`
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// `string`
    String(String),
    /// `address[]`
    AddressArray(Vec<Account>),
}

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// First four bytes of the hashed function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `topics[0]` of an event.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

/// Big-endian uint256 word.
pub fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

/// Left-padded address word.
pub fn address_word(account: &Account) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(account.as_bytes());
    word
}

/// Head/tail encode a token list.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(account) => head.extend_from_slice(&address_word(account)),
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Bool(flag) => head.extend_from_slice(&uint_word(U256::from(*flag as u8))),
            Token::String(text) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                let bytes = text.as_bytes();
                tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
            Token::AddressArray(list) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&uint_word(U256::from(list.len())));
                for account in list {
                    tail.extend_from_slice(&address_word(account));
                }
            }
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode(tokens));
    data
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], QuizError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            QuizError::Decode(format!(
                "word at offset {offset} out of bounds (len {})",
                data.len()
            ))
        })
}

fn to_usize(value: U256) -> Result<usize, QuizError> {
    if value.bits() > 32 {
        return Err(QuizError::Decode(format!("offset or length too large: {value}")));
    }
    Ok(value.as_usize())
}

/// Decode a single uint256 return value.
pub fn decode_uint(data: &[u8]) -> Result<U256, QuizError> {
    Ok(U256::from_big_endian(word_at(data, 0)?))
}

/// Decode a single bool return value.
pub fn decode_bool(data: &[u8]) -> Result<bool, QuizError> {
    let value = decode_uint(data)?;
    if value.is_zero() {
        Ok(false)
    } else if value == U256::one() {
        Ok(true)
    } else {
        Err(QuizError::Decode(format!("not a bool: {value}")))
    }
}

/// Decode an address from a 32-byte word (dirty high bytes are rejected).
pub fn decode_address(word: &[u8]) -> Result<Account, QuizError> {
    let word = word_at(word, 0)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(QuizError::Decode("address word has dirty high bytes".to_string()));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Account::new(bytes))
}

/// Decode a single `address[]` return value.
pub fn decode_address_array(data: &[u8]) -> Result<Vec<Account>, QuizError> {
    let offset = to_usize(decode_uint(data)?)?;
    let len = to_usize(U256::from_big_endian(word_at(data, offset)?))?;

    let body = offset + WORD;
    let needed = len
        .checked_mul(WORD)
        .and_then(|n| n.checked_add(body))
        .ok_or_else(|| QuizError::Decode("address[] length overflow".to_string()))?;
    if needed > data.len() {
        return Err(QuizError::Decode(format!(
            "address[] of {len} needs {needed} bytes, got {}",
            data.len()
        )));
    }

    (0..len)
        .map(|i| decode_address(word_at(data, body + i * WORD)?))
        .collect()
}

/// Decode one log into a known contract event.
///
/// Unknown topics and malformed payloads yield `None`.
pub fn decode_log(log: &LogEntry) -> Option<ContractEvent> {
    let topic0 = log.topics.first()?;

    if *topic0 == event_topic(WINNER_DECLARED) {
        let winner = decode_address(log.topics.get(1)?).ok()?;
        let reward = decode_uint(&log.data).ok()?;
        return Some(ContractEvent::WinnerDeclared {
            winner,
            reward: Wei(reward),
        });
    }

    if *topic0 == event_topic(TOURNAMENT_ENDED) {
        let value = decode_uint(&log.data).ok()?;
        return Some(ContractEvent::TournamentEnded { value });
    }

    None
}

/// Every known event emitted by `contract` in a receipt, in log order.
pub fn decode_receipt_events(receipt: &TxReceipt, contract: &Account) -> Vec<ContractEvent> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == *contract)
        .filter_map(|log| {
            let event = decode_log(log);
            if event.is_none() {
                debug!(tx_hash = %receipt.hash, topics = log.topics.len(), "Skipping unrecognised log");
            }
            event
        })
        .collect()
}

/// Build a `WinnerDeclared` log.
pub fn winner_declared_log(contract: Account, winner: &Account, reward: U256) -> LogEntry {
    LogEntry {
        address: contract,
        topics: vec![event_topic(WINNER_DECLARED), address_word(winner)],
        data: uint_word(reward).to_vec(),
    }
}

/// Build a `TournamentEnded` log.
pub fn tournament_ended_log(contract: Account, value: U256) -> LogEntry {
    LogEntry {
        address: contract,
        topics: vec![event_topic(TOURNAMENT_ENDED)],
        data: uint_word(value).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxHash;

    fn account(byte: u8) -> Account {
        Account::new([byte; 20])
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_selector_known_value() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn test_encode_static_args() {
        let data = encode_call("scoresOf(address)", &[Token::Address(account(0xAB))]);
        assert_eq!(data.len(), 4 + WORD);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..], &[0xAB; 20]);
    }

    #[test]
    fn test_encode_string_arg() {
        let data = encode(&[Token::Uint(U256::from(2)), Token::String("Remix".into())]);
        // head: uint, offset; tail: length, padded bytes
        assert_eq!(data.len(), 4 * WORD);
        assert_eq!(U256::from_big_endian(&data[WORD..2 * WORD]), U256::from(64));
        assert_eq!(U256::from_big_endian(&data[2 * WORD..3 * WORD]), U256::from(5));
        assert_eq!(&data[3 * WORD..3 * WORD + 5], b"Remix");
        assert!(data[3 * WORD + 5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_address_array() {
        let data = encode(&[Token::AddressArray(vec![account(1), account(2)])]);
        assert_eq!(decode_address_array(&data).unwrap(), vec![account(1), account(2)]);
    }

    #[test]
    fn test_decode_address_array_truncated() {
        let mut data = encode(&[Token::AddressArray(vec![account(1), account(2)])]);
        data.truncate(data.len() - 1);
        assert!(matches!(decode_address_array(&data), Err(QuizError::Decode(_))));
    }

    #[test]
    fn test_decode_address_array_absurd_length() {
        let mut data = uint_word(U256::from(32)).to_vec();
        data.extend_from_slice(&uint_word(U256::MAX));
        assert!(decode_address_array(&data).is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert!(decode_bool(&uint_word(U256::one())).unwrap());
        assert!(!decode_bool(&uint_word(U256::zero())).unwrap());
        assert!(decode_bool(&uint_word(U256::from(2))).is_err());
        assert!(decode_bool(&[1u8; 3]).is_err());
    }

    #[test]
    fn test_decode_address_rejects_dirty_word() {
        let word = [0xFFu8; 32];
        assert!(decode_address(&word).is_err());
    }

    #[test]
    fn test_receipt_with_two_winners() {
        let contract = account(0xCC);
        let reward = U256::from_dec_str("1500000000000000001").unwrap();
        let receipt = TxReceipt {
            hash: TxHash::new([9; 32]),
            success: true,
            block_number: Some(7),
            logs: vec![
                winner_declared_log(contract, &account(1), reward),
                winner_declared_log(contract, &account(2), U256::exp10(18)),
                tournament_ended_log(contract, U256::from(2)),
            ],
        };

        let events = decode_receipt_events(&receipt, &contract);
        let winners = crate::domain::winners_from_events(&events);
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[0].account, account(1));
        assert_eq!(winners[0].reward.format_ether(), "1.500000000000000001");
        assert_eq!(winners[1].reward.format_ether(), "1.0");
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_receipt_ignores_foreign_and_unknown_logs() {
        let contract = account(0xCC);
        let receipt = TxReceipt {
            hash: TxHash::new([9; 32]),
            success: true,
            block_number: None,
            logs: vec![
                winner_declared_log(account(0xDD), &account(1), U256::one()),
                LogEntry {
                    address: contract,
                    topics: vec![event_topic("Transfer(address,address,uint256)")],
                    data: vec![],
                },
            ],
        };
        assert!(decode_receipt_events(&receipt, &contract).is_empty());
    }
}

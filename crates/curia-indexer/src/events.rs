//! Decoding for the two contract event vocabularies this ledger tracks: the
//! stake vault (deposits, withdrawals, slashes) and the treasury vault
//! (donations).

use crate::client::EventLog;
use crate::error::{IndexerError, Result};
use curia_types::Address;
use tiny_keccak::{Hasher, Keccak};

pub const SIG_DEPOSITED: &str = "Deposited(address,address,uint256)";
pub const SIG_WITHDRAWN: &str = "Withdrawn(address,uint256)";
pub const SIG_SLASHED: &str = "Slashed(address,address,uint256,uint256)";
pub const SIG_DONATION_RECEIVED: &str = "DonationReceived(address,address,uint256,uint32,bytes32)";

pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(input);
    hasher.finalize(&mut output);
    output
}

/// topic0 for an event signature.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

#[derive(Debug, Clone)]
pub struct Deposited {
    pub payer: Address,
    pub agent: Address,
    pub amount: u128,
}

#[derive(Debug, Clone)]
pub struct Withdrawn {
    pub agent: Address,
    pub amount: u128,
}

#[derive(Debug, Clone)]
pub struct Slashed {
    pub agent: Address,
    pub recipient: Address,
    pub requested_amount: u128,
    pub actual_amount: u128,
}

#[derive(Debug, Clone)]
pub struct DonationReceived {
    pub donor: Address,
    pub asset: Address,
    pub amount: u128,
    pub purpose_id: u32,
    pub memo_hash: [u8; 32],
}

fn indexed_topic(log: &EventLog, index: usize) -> Result<[u8; 32]> {
    log.topics
        .get(index)
        .copied()
        .ok_or_else(|| IndexerError::Decode(format!("missing topic {} in {}", index, log.tx_hash)))
}

fn topic_address(log: &EventLog, index: usize) -> Result<Address> {
    let topic = indexed_topic(log, index)?;
    Ok(Address::new(format!("0x{}", hex::encode(&topic[12..]))))
}

fn topic_u32(log: &EventLog, index: usize) -> Result<u32> {
    let topic = indexed_topic(log, index)?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&topic[28..]);
    Ok(u32::from_be_bytes(buf))
}

fn data_word(log: &EventLog, index: usize) -> Result<[u8; 32]> {
    let start = index * 32;
    let end = start + 32;
    if log.data.len() < end {
        return Err(IndexerError::Decode(format!(
            "data too short ({} bytes, wanted word {}) in {}",
            log.data.len(),
            index,
            log.tx_hash
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&log.data[start..end]);
    Ok(word)
}

fn word_u128(word: [u8; 32], tx_hash: &str) -> Result<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(IndexerError::Decode(format!(
            "uint256 exceeds u128 in {}",
            tx_hash
        )));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(buf))
}

pub fn decode_deposited(log: &EventLog) -> Result<Deposited> {
    Ok(Deposited {
        payer: topic_address(log, 1)?,
        agent: topic_address(log, 2)?,
        amount: word_u128(data_word(log, 0)?, &log.tx_hash)?,
    })
}

pub fn decode_withdrawn(log: &EventLog) -> Result<Withdrawn> {
    Ok(Withdrawn {
        agent: topic_address(log, 1)?,
        amount: word_u128(data_word(log, 0)?, &log.tx_hash)?,
    })
}

pub fn decode_slashed(log: &EventLog) -> Result<Slashed> {
    Ok(Slashed {
        agent: topic_address(log, 1)?,
        recipient: topic_address(log, 2)?,
        requested_amount: word_u128(data_word(log, 0)?, &log.tx_hash)?,
        actual_amount: word_u128(data_word(log, 1)?, &log.tx_hash)?,
    })
}

pub fn decode_donation_received(log: &EventLog) -> Result<DonationReceived> {
    Ok(DonationReceived {
        donor: topic_address(log, 1)?,
        asset: topic_address(log, 2)?,
        purpose_id: topic_u32(log, 3)?,
        amount: word_u128(data_word(log, 0)?, &log.tx_hash)?,
        memo_hash: data_word(log, 1)?,
    })
}

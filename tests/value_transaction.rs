//! End-to-end value-file transaction scenario (spec §8 scenario 5 and the
//! credit-linearity / abort-rollback round-trip laws), driven against an
//! in-memory mock transport instead of real hardware.

use desfire_core::card;
use desfire_core::engine::Engine;
use desfire_core::error::Result;
use desfire_core::transport::ReaderTransport;

/// Minimal stateful card: tracks a single value file's committed balance
/// and the pending credit/debit delta of an open transaction, and echoes
/// `91 00` for everything else (file creation, writes).
struct ValueFileCard {
    balance: i32,
    pending: i32,
}

impl ValueFileCard {
    fn new() -> Self {
        ValueFileCard { balance: 0, pending: 0 }
    }
}

impl ReaderTransport for ValueFileCard {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        let ins = command[1];
        let lc = command.get(4).copied().unwrap_or(0) as usize;
        let data = &command[5..5 + lc];
        match ins {
            0x6C => {
                let mut resp = self.balance.to_le_bytes().to_vec();
                resp.extend_from_slice(&[0x91, 0x00]);
                Ok(resp)
            }
            0x0C => {
                self.pending += i32::from_le_bytes(data[1..5].try_into().unwrap());
                Ok(vec![0x91, 0x00])
            }
            0xDC => {
                self.pending -= i32::from_le_bytes(data[1..5].try_into().unwrap());
                Ok(vec![0x91, 0x00])
            }
            0xC7 => {
                self.balance += self.pending;
                self.pending = 0;
                Ok(vec![0x91, 0x00])
            }
            0xA7 => {
                self.pending = 0;
                Ok(vec![0x91, 0x00])
            }
            _ => Ok(vec![0x91, 0x00]),
        }
    }
}

#[test]
fn credit_write_commit_updates_balance() {
    let mut engine = Engine::new(ValueFileCard::new());
    assert_eq!(card::get_value(&mut engine, 0).unwrap(), 0);

    card::credit(&mut engine, 0, 100).unwrap();
    let record = [0u8; 24];
    card::write_data(&mut engine, 1, 0, &record).unwrap();
    card::commit_transaction(&mut engine).unwrap();

    assert_eq!(card::get_value(&mut engine, 0).unwrap(), 100);
}

#[test]
fn abort_leaves_balance_unchanged() {
    let mut engine = Engine::new(ValueFileCard::new());
    card::credit(&mut engine, 0, 100).unwrap();
    card::abort_transaction(&mut engine).unwrap();
    assert_eq!(card::get_value(&mut engine, 0).unwrap(), 0);
}

#[test]
fn two_credits_then_commit_is_additive() {
    let mut engine = Engine::new(ValueFileCard::new());
    card::credit(&mut engine, 0, 30).unwrap();
    card::credit(&mut engine, 0, 70).unwrap();
    card::commit_transaction(&mut engine).unwrap();
    assert_eq!(card::get_value(&mut engine, 0).unwrap(), 100);
}

#[test]
fn debit_reduces_balance_after_commit() {
    let mut engine = Engine::new(ValueFileCard::new());
    card::credit(&mut engine, 0, 100).unwrap();
    card::commit_transaction(&mut engine).unwrap();
    card::debit(&mut engine, 0, 40).unwrap();
    card::commit_transaction(&mut engine).unwrap();
    assert_eq!(card::get_value(&mut engine, 0).unwrap(), 60);
}

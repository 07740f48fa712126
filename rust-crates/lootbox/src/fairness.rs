//! Commit-reveal fairness.
//!
//! Before play the player sees `SHA-256(server seed)`. Every opening draws
//! its randomness from `HMAC-SHA256(server seed, "{client seed}:{nonce}:{round}")`,
//! so once the seed is revealed anyone can recompute the commitment and
//! replay each opening.

use crate::{
    Case,
    Error,
    Item,
    RarityWeights,
    Result,
    resolver::{
        self,
        EmptyTierPolicy,
    },
};
use hmac::{
    Hmac,
    Mac,
};
use rand::{
    Rng,
    RngCore,
};
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::fmt;
use tracing::info;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_CLIENT_SEED: &str = "user_generated_seed_12345";

const SEED_LEN: usize = 32;
const BLOCK_LEN: usize = 32;

#[derive(Clone, PartialEq, Eq)]
pub struct ServerSeed([u8; SEED_LEN]);

impl ServerSeed {
    pub fn random() -> Self {
        ServerSeed(rand::rng().random())
    }

    pub fn from_hex(seed_hex: &str) -> Result<Self> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| Error::Fairness(format!("server seed is not hex: {e}")))?;
        let bytes: [u8; SEED_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::Fairness(format!(
                "server seed must be {SEED_LEN} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(ServerSeed(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex `SHA-256` of the seed bytes.
    pub fn commitment(&self) -> String {
        hex::encode(Sha256::digest(self.0))
    }
}

// keeps the secret out of logs
impl fmt::Debug for ServerSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServerSeed").field(&self.commitment()).finish()
    }
}

/// Deterministic byte stream keyed by a server seed.
pub struct FairRng {
    mac: HmacSha256,
    client_seed: String,
    nonce: u64,
    round: u64,
    block: [u8; BLOCK_LEN],
    offset: usize,
}

impl FairRng {
    pub fn new(server_seed: &ServerSeed, client_seed: &str, nonce: u64) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(&server_seed.0)
            .map_err(|e| Error::Fairness(format!("hmac key rejected: {e}")))?;
        Ok(FairRng {
            mac,
            client_seed: client_seed.to_string(),
            nonce,
            round: 0,
            block: [0; BLOCK_LEN],
            offset: BLOCK_LEN,
        })
    }

    fn refill(&mut self) {
        let mut mac = self.mac.clone();
        mac.update(format!("{}:{}:{}", self.client_seed, self.nonce, self.round).as_bytes());
        self.block.copy_from_slice(&mac.finalize().into_bytes());
        self.round += 1;
        self.offset = 0;
    }
}

impl RngCore for FairRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0; 4];
        self.fill_bytes(&mut buf);
        u32::from_be_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0; 8];
        self.fill_bytes(&mut buf);
        u64::from_be_bytes(buf)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut written = 0;
        while written < dst.len() {
            if self.offset == BLOCK_LEN {
                self.refill();
            }
            let take = (BLOCK_LEN - self.offset).min(dst.len() - written);
            dst[written..written + take]
                .copy_from_slice(&self.block[self.offset..self.offset + take]);
            self.offset += take;
            written += take;
        }
    }
}

/// The displayed result in `0..100`: the first four bytes of round 0 read
/// big-endian and scaled.
pub fn roll_number(server_seed: &ServerSeed, client_seed: &str, nonce: u64) -> Result<u32> {
    let raw = FairRng::new(server_seed, client_seed, nonce)?.next_u32();
    Ok(((u64::from(raw) * 100) >> 32) as u32)
}

/// Inputs a player needs to check one opening once the seed is revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FairnessProof {
    pub commitment: String,
    pub client_seed: String,
    pub nonce: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedSeed {
    pub seed_hex: String,
    pub commitment: String,
}

#[derive(Debug)]
pub struct FairnessState {
    server_seed: ServerSeed,
    client_seed: String,
    nonce: u64,
    revealed: Vec<RevealedSeed>,
}

impl Default for FairnessState {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_SEED)
    }
}

impl FairnessState {
    pub fn new(client_seed: &str) -> Self {
        Self::with_server_seed(ServerSeed::random(), client_seed)
    }

    pub fn with_server_seed(server_seed: ServerSeed, client_seed: &str) -> Self {
        FairnessState {
            server_seed,
            client_seed: client_seed.to_string(),
            nonce: 1,
            revealed: Vec::new(),
        }
    }

    pub fn commitment(&self) -> String {
        self.server_seed.commitment()
    }

    pub fn client_seed(&self) -> &str {
        &self.client_seed
    }

    /// Nonce the next opening will use.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Seeds revealed so far, oldest first.
    pub fn revealed(&self) -> &[RevealedSeed] {
        &self.revealed
    }

    pub fn find_revealed(&self, commitment: &str) -> Option<&RevealedSeed> {
        self.revealed.iter().find(|r| r.commitment == commitment)
    }

    /// Hands out the stream for the next opening and consumes its nonce.
    pub fn next_draw(&mut self) -> Result<(FairRng, FairnessProof)> {
        let rng = FairRng::new(&self.server_seed, &self.client_seed, self.nonce)?;
        let proof = FairnessProof {
            commitment: self.commitment(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        };
        self.nonce += 1;
        Ok((rng, proof))
    }

    /// Reveals the current seed and commits to a fresh one.
    pub fn rotate(&mut self) -> RevealedSeed {
        let old = std::mem::replace(&mut self.server_seed, ServerSeed::random());
        let revealed = RevealedSeed {
            seed_hex: old.to_hex(),
            commitment: old.commitment(),
        };
        self.nonce = 1;
        self.revealed.push(revealed.clone());
        info!(commitment = %revealed.commitment, "server seed revealed");
        revealed
    }

    /// Changing the client seed always rotates, so the new seed is never
    /// chosen against a known server seed.
    pub fn set_client_seed(&mut self, client_seed: &str) -> Result<RevealedSeed> {
        let client_seed = client_seed.trim();
        if client_seed.is_empty() {
            return Err(Error::Fairness("client seed must not be empty".to_string()));
        }
        self.client_seed = client_seed.to_string();
        Ok(self.rotate())
    }
}

pub fn verify_commitment(seed_hex: &str, commitment: &str) -> Result<bool> {
    let seed = ServerSeed::from_hex(seed_hex)?;
    Ok(seed.commitment().eq_ignore_ascii_case(commitment.trim()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    pub commitment: String,
    pub roll: u32,
    /// `None` when no commitment was supplied to check against.
    pub matches_commitment: Option<bool>,
}

pub fn verify_roll(
    seed_hex: &str,
    client_seed: &str,
    nonce: u64,
    expected_commitment: Option<&str>,
) -> Result<Verification> {
    let seed = ServerSeed::from_hex(seed_hex)?;
    let commitment = seed.commitment();
    let matches_commitment =
        expected_commitment.map(|c| commitment.eq_ignore_ascii_case(c.trim()));
    Ok(Verification {
        roll: roll_number(&seed, client_seed, nonce)?,
        commitment,
        matches_commitment,
    })
}

/// Re-runs the resolver on the stream a past opening used.
pub fn replay_opening<'c>(
    case: &'c Case,
    weights: &RarityWeights,
    policy: EmptyTierPolicy,
    seed_hex: &str,
    client_seed: &str,
    nonce: u64,
) -> Result<&'c Item> {
    let seed = ServerSeed::from_hex(seed_hex)?;
    let mut rng = FairRng::new(&seed, client_seed, nonce)?;
    resolver::resolve(case, weights, policy, &mut rng)
}

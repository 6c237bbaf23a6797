//! NEAR transaction encoding and signing
//!
//! Only the subset the relay sends is modelled: ed25519 keys and
//! `FunctionCall` actions. Field order and enum tags follow the protocol's
//! borsh layout, so the bytes here are exactly what the node hashes.

use std::io::{self, Write};

use borsh::BorshSerialize;
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use super::FunctionCallAction;
use super::error::RpcError;

/// Position of `FunctionCall` in the protocol's `Action` enum
const FUNCTION_CALL_TAG: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub enum PublicKey {
    Ed25519([u8; 32]),
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub enum Signature {
    Ed25519([u8; 64]),
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct FunctionCall {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FunctionCall(FunctionCall),
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Action::FunctionCall(call) => {
                FUNCTION_CALL_TAG.serialize(writer)?;
                call.serialize(writer)
            }
        }
    }
}

impl TryFrom<&FunctionCallAction> for Action {
    type Error = RpcError;

    fn try_from(action: &FunctionCallAction) -> Result<Self, Self::Error> {
        let args = serde_json::to_vec(&action.args)
            .map_err(|e| RpcError::Signing(format!("unencodable args: {}", e)))?;
        let deposit = action.deposit.parse::<u128>().map_err(|_| {
            RpcError::Signing(format!("deposit '{}' is not a yoctoNEAR amount", action.deposit))
        })?;
        Ok(Action::FunctionCall(FunctionCall {
            method_name: action.method_name.clone(),
            args,
            gas: action.gas,
            deposit,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl Transaction {
    /// sha256 of the borsh encoding; this is what gets signed and what the
    /// chain reports as the transaction hash
    pub fn hash(&self) -> Result<[u8; 32], RpcError> {
        let bytes = borsh::to_vec(self).map_err(|e| RpcError::Signing(e.to_string()))?;
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn sign(self, key: &SigningKey) -> Result<SignedTransaction, RpcError> {
        let hash = self.hash()?;
        let signature = key.sign(&hash);
        Ok(SignedTransaction {
            transaction: self,
            signature: Signature::Ed25519(signature.to_bytes()),
        })
    }
}

impl SignedTransaction {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RpcError> {
        borsh::to_vec(self).map_err(|e| RpcError::Signing(e.to_string()))
    }
}

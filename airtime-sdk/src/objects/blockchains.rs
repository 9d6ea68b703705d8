use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Networks on which the payment token is accepted
pub enum Network {
    #[serde(rename = "eth")]
    Ethereum,
    #[serde(rename = "base")]
    Base,
}

impl Network {
    /// EIP-155 chain id.
    pub const fn chain_id(self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Base => 8453,
        }
    }

    pub const fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Network::Ethereum),
            8453 => Some(Network::Base),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum",
            Network::Base => "Base",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Stablecoins the checkout can be paid with
#[serde(rename_all = "UPPERCASE")]
pub enum Stablecoin {
    Usdc,
}

impl Stablecoin {
    /// Number of decimal places in the token's minor unit.
    pub const fn decimals(self) -> u32 {
        match self {
            Stablecoin::Usdc => 6,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Stablecoin::Usdc => "USDC",
        }
    }

    /// Canonical token contract on the given network.
    pub const fn contract_address(self, network: Network) -> &'static str {
        match (self, network) {
            (Stablecoin::Usdc, Network::Ethereum) => "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            (Stablecoin::Usdc, Network::Base) => "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        }
    }
}

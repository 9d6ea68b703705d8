//! Contract interfaces and call helpers.
//!
//! Only the functions the app actually calls are declared.

use super::{Address, Bytes, ChainError, ChainReader, U256};
use alloy_sol_types::{SolCall, sol};

sol! {
    /// Standard fungible token subset used for payment.
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address recipient, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }
}

sol! {
    /// Mint whitelist.
    interface IWhitelist {
        function whitelistedAddresses(address account) external view returns (bool);
        function addAddressToWhitelist() external;
    }
}

sol! {
    /// Enumerable access NFT.
    interface IAccessNft {
        function mint() external;
        function balanceOf(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
    }
}

/// ABI-encode a call into transaction input.
pub fn calldata<C: SolCall>(call: &C) -> Bytes {
    call.abi_encode().into()
}

/// Run a view call and decode its return value.
pub async fn read<C, R>(reader: &R, to: Address, call: C) -> Result<C::Return, ChainError>
where
    C: SolCall + Send,
    R: ChainReader + ?Sized,
{
    let output = reader.call(None, to, calldata(&call)).await?;
    C::abi_decode_returns(&output)
        .map_err(|e| ChainError::Decode(format!("{}: {e}", C::SIGNATURE)))
}

pub async fn allowance<R: ChainReader + ?Sized>(
    reader: &R,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256, ChainError> {
    read(reader, token, IERC20::allowanceCall { owner, spender }).await
}

pub async fn balance_of<R: ChainReader + ?Sized>(
    reader: &R,
    token: Address,
    account: Address,
) -> Result<U256, ChainError> {
    read(reader, token, IERC20::balanceOfCall { account }).await
}

//! Defines arguments passed to each test

use std::path::PathBuf;

use alloy::{
    primitives::{utils::parse_ether, Address, U256},
    providers::{ext::AnvilApi, Provider},
    signers::local::{coins_bip39::English, MnemonicBuilder},
};
use eyre::{eyre, Result};
use scripts::{
    artifacts::ArtifactStore,
    chain::ContractDeployer,
    rpc::{send_tx, RpcChain, Wallet},
    types::AdminAbi,
    utils::client_from_signer,
};

use crate::{vbtc::VBTC::VBTCInstance, CliArgs};

/// The artifact name of the token
const VBTC_CONTRACT_NAME: &str = "VBTC";

/// The number of devnet accounts the tests use
const NUM_ACCOUNTS: u32 = 16;

/// The deployer and owner of every token
pub(crate) const OWNER: usize = 0;
/// The account receiving the pre-minted supply
pub(crate) const PRE_MINT: usize = 1;
/// The management account, which receives the dev fund tax
pub(crate) const MANAGEMENT: usize = 2;
/// The tax collector, which receives the sell tax
pub(crate) const TAX_COLLECTOR: usize = 3;
/// An account with no role
pub(crate) const OUTSIDER: usize = 10;

/// The supply minted to [`PRE_MINT`] on initialization
pub(crate) fn pre_mint_amount() -> Result<U256> {
    Ok(parse_ether("42640099")?)
}

/// The token instance type used by the tests
pub(crate) type Token = VBTCInstance<Wallet>;

/// The arguments provided to each integration test
#[derive(Clone)]
pub(crate) struct TestArgs {
    /// Directory holding compiled contract artifacts
    artifacts_dir: PathBuf,
    /// One signing client per devnet account
    clients: Vec<Wallet>,
    /// The address of each devnet account
    addresses: Vec<Address>,
}

impl TestArgs {
    /// Derive the devnet accounts and make sure each can pay for gas
    pub async fn new(cli: &CliArgs) -> Result<Self> {
        let mut clients = Vec::new();
        let mut addresses = Vec::new();
        for index in 0..NUM_ACCOUNTS {
            let signer = MnemonicBuilder::<English>::default()
                .phrase(cli.mnemonic.as_str())
                .index(index)?
                .build()?;

            addresses.push(signer.address());
            clients.push(client_from_signer(signer, &cli.rpc_url)?);
        }

        let args = Self {
            artifacts_dir: cli.artifacts_dir.clone(),
            clients,
            addresses,
        };
        args.fund_accounts().await?;

        Ok(args)
    }

    /// Top up every account holding less than 100 ETH
    async fn fund_accounts(&self) -> Result<()> {
        let provider = self.client(OWNER)?;
        let bal = parse_ether("100")?;
        for address in self.addresses.iter() {
            if provider.get_balance(*address).await? < bal {
                provider.anvil_set_balance(*address, bal).await?;
            }
        }

        Ok(())
    }

    /// The signing client of the given account
    pub fn client(&self, user: usize) -> Result<&Wallet> {
        self.clients
            .get(user)
            .ok_or_else(|| eyre!("no devnet account {user}"))
    }

    /// The address of the given account
    pub fn address(&self, user: usize) -> Result<Address> {
        self.addresses
            .get(user)
            .copied()
            .ok_or_else(|| eyre!("no devnet account {user}"))
    }

    /// The token at `address`, as seen by the given account
    pub fn token(&self, user: usize, address: Address) -> Result<Token> {
        Ok(VBTCInstance::new(address, self.client(user)?.clone()))
    }

    /// Deploy and initialize a fresh token owned by [`OWNER`]
    pub async fn deploy_token(&self) -> Result<Address> {
        let chain = RpcChain::new(
            self.client(OWNER)?.clone(),
            ArtifactStore::new(&self.artifacts_dir),
            AdminAbi::default(),
        );
        let address = chain.deploy(VBTC_CONTRACT_NAME, &[]).await?;

        let token = self.token(OWNER, address)?;
        send_tx(token.initialize(
            self.address(MANAGEMENT)?,
            self.address(TAX_COLLECTOR)?,
            self.address(PRE_MINT)?,
            pre_mint_amount()?,
        ))
        .await?;

        Ok(address)
    }

    /// The token balance of the given account
    pub async fn balance_of(&self, token: Address, user: usize) -> Result<U256> {
        let address = self.address(user)?;
        self.balance_of_address(token, address).await
    }

    /// The token balance of an arbitrary address
    pub async fn balance_of_address(&self, token: Address, address: Address) -> Result<U256> {
        let balance = self.token(OWNER, token)?.balanceOf(address).call().await?;
        Ok(balance)
    }
}

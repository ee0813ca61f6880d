use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use openape::wallet::connector::InjectedConnector;
use openape::wallet::error_message;
use openape::{
    hash_data_key, ConnectButton, ConnectionState, KeyPair, LogNotifier, Nft, SkyDbBackend,
    SkyDbConfig, SkynetClient, UserStore, UserUpdate, WalletConfig,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// OpenApe datastore and wallet tool
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Skynet portal (overrides SKYNET_PORTAL_URL)
    #[arg(long, global = true)]
    portal: Option<String>,

    /// SkyDB data key (overrides SKYDB_DATA_KEY)
    #[arg(long, global = true)]
    data_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the SkyDB public key and data key hash derived from the seed
    Keys,
    /// Add an empty record for an address
    Onboard { address: String },
    /// Print the record for an address
    User { address: String },
    /// Find a user by username
    Find { username: String },
    SetUsername { address: String, username: String },
    /// Log a transaction hash for an address
    LogTx { address: String, hash: String },
    /// Append to the legacy contract address log
    LogContract { address: String, contract: String },
    /// Insert or replace an NFT in a collection
    AddNft {
        address: String,
        contract: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: String,
    },
    /// Give a collection a title
    SetTitle {
        address: String,
        contract: String,
        title: String,
    },
    /// All collections of an address
    Collections { address: String },
    /// NFTs of one collection
    Collection { address: String, contract: String },
    CollectionByTitle { address: String, title: String },
    /// Print the whole document
    Dump,
    /// Connect the injected wallet and onboard its account
    Connect {
        /// Keep following account and chain changes
        #[arg(long)]
        watch: bool,

        /// Provider poll interval in seconds
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = SkyDbConfig::from_env();
    if let Some(portal) = cli.portal {
        config.portal_url = portal;
    }
    if let Some(data_key) = cli.data_key {
        config.data_key = data_key;
    }
    let store = UserStore::new(SkyDbBackend::from_config(&config));

    match cli.command {
        Command::Keys => {
            let keys = KeyPair::from_seed(&config.seed);
            println!("portal:        {}", SkynetClient::new(&config.portal_url).portal_url());
            println!("public key:    {}", keys.public_key());
            println!("data key:      {}", config.data_key);
            println!("data key hash: {}", hex::encode(hash_data_key(&config.data_key)));
        }
        Command::Onboard { address } => store.onboard_user(&address).await,
        Command::User { address } => {
            let user = store
                .get_user(&address)
                .await
                .context("Failed to read user")?;
            print_json(&user)?;
        }
        Command::Find { username } => print_json(&store.get_user_by_username(&username).await)?,
        Command::SetUsername { address, username } => {
            store
                .update_user(&address, UserUpdate::username(username))
                .await
        }
        Command::LogTx { address, hash } => store.log_transaction(&address, &hash).await,
        Command::LogContract { address, contract } => {
            store.log_contract_address(&address, &contract).await
        }
        Command::AddNft {
            address,
            contract,
            name,
            description,
            image,
        } => {
            store
                .update_user_nfts(&address, &contract, Nft::new(name, description, image))
                .await
        }
        Command::SetTitle {
            address,
            contract,
            title,
        } => store.set_collection_title(&address, &contract, &title).await,
        Command::Collections { address } => print_json(&store.get_all_collections(&address).await)?,
        Command::Collection { address, contract } => {
            print_json(&store.get_nfts_of_collection(&address, &contract).await)?
        }
        Command::CollectionByTitle { address, title } => print_json(
            &store
                .get_collection_by_collection_title(&address, &title)
                .await,
        )?,
        Command::Dump => print_json(&store.get_document().await)?,
        Command::Connect { watch, interval } => {
            let wallet_config = WalletConfig::from_env().context("Invalid wallet configuration")?;
            connect(store, &wallet_config, watch, Duration::from_secs(interval)).await?;
        }
    }

    Ok(())
}

async fn connect(
    store: UserStore<SkyDbBackend>,
    config: &WalletConfig,
    watch: bool,
    interval: Duration,
) -> Result<()> {
    let connector = Arc::new(InjectedConnector::from_config(config));
    let button = Arc::new(ConnectButton::new(connector.clone(), Arc::new(LogNotifier)));

    log::info!("[{}]", button.view().label);
    let state = button.click().await;
    log::info!("[{}]", button.view().label);

    if let ConnectionState::Connected { account, chain_id } = &state {
        println!("Connected {} on chain {}", account, chain_id);
        store.onboard_user(account).await;
    }
    if !watch || !state.is_connected() {
        return Ok(());
    }

    let events = connector.spawn_event_bridge(interval);
    let listener = {
        let button = button.clone();
        tokio::spawn(async move { button.listen(events).await })
    };

    // Onboard every account the wallet switches to
    let mut updates = button.subscribe();
    let mut last_account = state.account().map(str::to_string);
    while updates.changed().await.is_ok() {
        let current = updates.borrow_and_update().clone();
        match &current {
            ConnectionState::Connected { account, .. }
                if last_account.as_deref() != Some(account.as_str()) =>
            {
                println!("Switched to {}", account);
                store.onboard_user(account).await;
                last_account = Some(account.clone());
            }
            ConnectionState::Connected { .. } => {}
            ConnectionState::Errored(e) => {
                println!("{}", error_message(e));
                break;
            }
            _ => {
                println!("Wallet disconnected");
                break;
            }
        }
    }

    listener.abort();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

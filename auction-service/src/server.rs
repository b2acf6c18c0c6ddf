// Copyright 2024-2025 Golem Cloud
//
// Licensed under the Golem Source License v1.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://license.golem.cloud/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use auction_common::SafeDisplay;
use auction_common::tracing::init_tracing_with_default_env_filter;
use auction_service::AuctionServer;
use auction_service::api::make_open_api_service;
use auction_service::bootstrap::Services;
use auction_service::config::{AuctionServiceConfig, make_config_loader};
use std::panic;
use tokio::task::JoinSet;
use tracing::info;

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--dump-openapi-yaml") {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(dump_openapi_yaml())
    } else if let Some(config) = make_config_loader().load_or_dump_config()? {
        init_tracing_with_default_env_filter(&config.tracing);
        info!("Using configuration:\n{}", config.to_safe_string_indented());

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(async_main(config))
    } else {
        Ok(())
    }
}

async fn dump_openapi_yaml() -> anyhow::Result<()> {
    let config = AuctionServiceConfig::default();
    let services = Services::new(&config).await?;

    let open_api_service = make_open_api_service(&services);
    println!("{}", open_api_service.spec_yaml());
    Ok(())
}

async fn async_main(config: AuctionServiceConfig) -> anyhow::Result<()> {
    let server = AuctionServer::new(config).await?;

    let mut join_set = JoinSet::<anyhow::Result<()>>::new();

    server.start(&mut join_set).await?;

    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => Err(err)?,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(err) => Err(err)?,
        }
    }

    Ok(())
}

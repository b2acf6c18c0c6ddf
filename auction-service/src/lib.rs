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

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod model;
pub mod repo;
pub mod services;
pub mod voice;

use self::bootstrap::Services;
use self::config::AuctionServiceConfig;
use anyhow::anyhow;
use poem::Route;
use poem::listener::Acceptor;
use poem::listener::Listener;
use poem_openapi::OpenApiService;
use tokio::task::JoinSet;
use tracing::{Instrument, info};

#[cfg(test)]
test_r::enable!();

pub struct RunDetails {
    pub http_port: u16,
}

#[derive(Clone)]
pub struct AuctionServer {
    config: AuctionServiceConfig,
    services: Services,
}

impl AuctionServer {
    pub async fn new(config: AuctionServiceConfig) -> Result<Self, anyhow::Error> {
        info!("Initializing auction service");

        let services = Services::new(&config).await?;

        Ok(Self { config, services })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn http_service(&self) -> OpenApiService<api::Apis, ()> {
        api::make_open_api_service(&self.services)
    }

    pub async fn start(
        &self,
        join_set: &mut JoinSet<Result<(), anyhow::Error>>,
    ) -> Result<RunDetails, anyhow::Error> {
        self.start_reconciler(join_set);
        let http_port = self.start_http_server(join_set).await?;

        Ok(RunDetails { http_port })
    }

    fn start_reconciler(&self, join_set: &mut JoinSet<Result<(), anyhow::Error>>) {
        let reconciler = self.services.reconciler.clone();
        join_set.spawn(async move { reconciler.run().await }.in_current_span());
    }

    async fn start_http_server(
        &self,
        join_set: &mut JoinSet<Result<(), anyhow::Error>>,
    ) -> Result<u16, anyhow::Error> {
        let api_service = self.http_service();

        let ui = api_service.swagger_ui();
        let spec = api_service.spec_endpoint_yaml();

        let app = Route::new()
            .nest("/", api_service)
            .nest("/docs", ui)
            .nest("/specs", spec);

        let poem_listener =
            poem::listener::TcpListener::bind(format!("0.0.0.0:{}", self.config.http_port));
        let acceptor = poem_listener.into_acceptor().await?;
        let port = acceptor
            .local_addr()
            .first()
            .and_then(|addr| addr.as_socket_addr())
            .map(|addr| addr.port())
            .ok_or_else(|| anyhow!("HTTP listener has no socket address"))?;

        join_set.spawn(
            async move {
                poem::Server::new_with_acceptor(acceptor)
                    .run(app)
                    .await
                    .map_err(|e| e.into())
            }
            .in_current_span(),
        );

        info!("Started auction-service http server on port {port}");

        Ok(port)
    }
}

//! QCS REST API client.
//!
//! [`QcsApi`] abstracts the device-description endpoints so that callers and
//! tests can substitute their own client. [`QcsApiClient`] is the production
//! implementation over `reqwest`.
//!
//! Functions that take `Option<&dyn QcsApi>` build a default client from
//! [`QcsConfig::load`] when given `None`; see [`provide_client`].

pub mod models;

use async_trait::async_trait;
use tracing::debug;

use crate::config::QcsConfig;
use crate::error::QcsResult;
use crate::http::HttpClient;

use models::{GetQuiltCalibrationsResponse, InstructionSetArchitecture, ListQuantumProcessorsResponse};

/// Page size used when walking every page of quantum processors.
pub const LIST_PAGE_SIZE: u32 = 100;

/// QCS device-description endpoints.
#[async_trait]
pub trait QcsApi: Send + Sync {
    /// `GET /v1/quantumProcessors`: one page of available processors.
    async fn list_quantum_processors(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> QcsResult<ListQuantumProcessorsResponse>;

    /// `GET /v1/quantumProcessors/{id}/instructionSetArchitecture`.
    async fn get_instruction_set_architecture(
        &self,
        quantum_processor_id: &str,
    ) -> QcsResult<InstructionSetArchitecture>;

    /// `GET /v1/quantumProcessors/{id}/quiltCalibrations`.
    async fn get_quilt_calibrations(
        &self,
        quantum_processor_id: &str,
    ) -> QcsResult<GetQuiltCalibrationsResponse>;
}

/// Production QCS API client.
#[derive(Debug, Clone)]
pub struct QcsApiClient {
    http: HttpClient,
}

impl QcsApiClient {
    /// Create a client from configuration.
    pub fn from_config(config: &QcsConfig) -> QcsResult<Self> {
        Ok(Self {
            http: HttpClient::new(&config.api_url, config)?,
        })
    }

    /// Create a client from the settings file and environment.
    pub fn from_env() -> QcsResult<Self> {
        Self::from_config(&QcsConfig::load(None)?)
    }
}

#[async_trait]
impl QcsApi for QcsApiClient {
    async fn list_quantum_processors(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> QcsResult<ListQuantumProcessorsResponse> {
        let mut query = Vec::new();
        if let Some(size) = page_size {
            query.push(("pageSize", size.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.http
            .get_json("list_quantum_processors", "/v1/quantumProcessors", &query)
            .await
    }

    async fn get_instruction_set_architecture(
        &self,
        quantum_processor_id: &str,
    ) -> QcsResult<InstructionSetArchitecture> {
        let path = format!("/v1/quantumProcessors/{quantum_processor_id}/instructionSetArchitecture");
        self.http
            .get_json("get_instruction_set_architecture", &path, &[])
            .await
    }

    async fn get_quilt_calibrations(
        &self,
        quantum_processor_id: &str,
    ) -> QcsResult<GetQuiltCalibrationsResponse> {
        let path = format!("/v1/quantumProcessors/{quantum_processor_id}/quiltCalibrations");
        self.http
            .get_json("get_quilt_calibrations", &path, &[])
            .await
    }
}

/// Use `client` if given, otherwise build a default client into `slot`.
///
/// The default client lives only as long as `slot`, i.e. for the duration
/// of the caller's operation.
pub fn provide_client<'a>(
    client: Option<&'a dyn QcsApi>,
    slot: &'a mut Option<QcsApiClient>,
) -> QcsResult<&'a dyn QcsApi> {
    match client {
        Some(client) => Ok(client),
        None => {
            debug!("no QCS client supplied, building default client");
            let client: &'a QcsApiClient = slot.insert(QcsApiClient::from_env()?);
            Ok(client)
        }
    }
}

/// Names of every available quantum computer.
///
/// Walks all pages of processors. With `qpus`, each processor ID is listed.
/// With `qvms`, each processor also appears as `<id>-qvm` and
/// `<id>-noisy-qvm`, and the generic `9q-square-qvm` and
/// `9q-square-noisy-qvm` are appended.
pub async fn list_quantum_computers(
    client: Option<&dyn QcsApi>,
    qpus: bool,
    qvms: bool,
) -> QcsResult<Vec<String>> {
    let mut slot = None;
    let client = provide_client(client, &mut slot)?;

    let mut names = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = client
            .list_quantum_processors(Some(LIST_PAGE_SIZE), page_token.as_deref())
            .await?;
        for processor in &page.quantum_processors {
            if qpus {
                names.push(processor.id.clone());
            }
            if qvms {
                names.push(format!("{}-qvm", processor.id));
                names.push(format!("{}-noisy-qvm", processor.id));
            }
        }
        match page.next_page() {
            Some(token) => page_token = Some(token.to_string()),
            None => break,
        }
    }
    if qvms {
        names.extend(["9q-square-qvm".to_string(), "9q-square-noisy-qvm".to_string()]);
    }
    Ok(names)
}

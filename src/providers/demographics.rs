//! Municipality lookup against the IBGE locality API.
//!
//! Demographic enrichment is optional: no match is `Ok(None)`, never an
//! error, and the pipeline skips the lookup entirely when the resolved
//! location is missing its city or state.

use crate::models::MunicipalityInfo;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Administrative-statistics lookup by city and state name.
#[async_trait]
pub trait Demographics: Send + Sync {
    async fn municipality(&self, city: &str, state: &str) -> Result<Option<MunicipalityInfo>>;
}

#[derive(Debug, Deserialize)]
struct IbgeMunicipality {
    id: u64,
    nome: String,
    microrregiao: Option<IbgeMicroregion>,
}

#[derive(Debug, Deserialize)]
struct IbgeMicroregion {
    mesorregiao: IbgeMesoregion,
}

#[derive(Debug, Deserialize)]
struct IbgeMesoregion {
    #[serde(rename = "UF")]
    uf: IbgeUf,
}

#[derive(Debug, Deserialize)]
struct IbgeUf {
    sigla: String,
    nome: String,
    regiao: IbgeRegion,
}

#[derive(Debug, Deserialize)]
struct IbgeRegion {
    nome: String,
}

/// IBGE locality API client.
pub struct IbgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl IbgeClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build IBGE HTTP client")?;

        Ok(Self { http, base_url })
    }

    /// Case-insensitive substring match of the city name, with the state
    /// accepted as either the UF abbreviation ("SP") or the full UF name
    /// ("São Paulo") - geocoders return the latter.
    fn find_match(
        municipalities: Vec<IbgeMunicipality>,
        city: &str,
        state: &str,
    ) -> Option<MunicipalityInfo> {
        let city_lower = city.to_lowercase();
        let state_lower = state.to_lowercase();

        municipalities.into_iter().find_map(|m| {
            if !m.nome.to_lowercase().contains(&city_lower) {
                return None;
            }
            let micro = m.microrregiao?;
            let uf = micro.mesorregiao.uf;
            if uf.sigla.to_lowercase() != state_lower && uf.nome.to_lowercase() != state_lower {
                return None;
            }
            Some(MunicipalityInfo {
                code: m.id,
                name: m.nome,
                state: uf.sigla,
                region: uf.regiao.nome,
                // Not present in the locality payload; a richer census
                // endpoint would fill these in.
                population: None,
                population_density: None,
                gdp_per_capita: None,
                hdi: None,
            })
        })
    }
}

#[async_trait]
impl Demographics for IbgeClient {
    async fn municipality(&self, city: &str, state: &str) -> Result<Option<MunicipalityInfo>> {
        let url = format!("{}/localidades/municipios", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("IBGE request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("IBGE API error: {}", response.status());
        }

        let municipalities: Vec<IbgeMunicipality> = response
            .json()
            .await
            .context("failed to parse IBGE response")?;

        Ok(Self::find_match(municipalities, city, state))
    }
}

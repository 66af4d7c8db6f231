use crate::domain::model::{CensusInputs, CensusResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn dataset_a_path(&self) -> &str;
    fn dataset_b_path(&self) -> &str;
    fn composition_path(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn target_classes(&self) -> &[String];
    fn threshold(&self) -> f64;
    fn coverage_thresholds(&self) -> &[f64];
    fn workers(&self) -> usize;
    fn overwrite(&self) -> bool;

    // 資料集顯示名稱，預設取檔名（去除 `_species` 後綴）
    fn dataset_a_name(&self) -> String {
        dataset_name_from_path(self.dataset_a_path())
    }

    fn dataset_b_name(&self) -> String {
        dataset_name_from_path(self.dataset_b_path())
    }
}

pub fn dataset_name_from_path(path: &str) -> String {
    let stem = std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    stem.strip_suffix("_species").unwrap_or(stem).to_string()
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<CensusInputs>;
    async fn transform(&self, inputs: CensusInputs) -> Result<CensusResult>;
    async fn load(&self, result: CensusResult) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_name_from_path() {
        assert_eq!(dataset_name_from_path("output/inat_species.json"), "inat");
        assert_eq!(dataset_name_from_path("haute_garonne.json"), "haute_garonne");
        assert_eq!(dataset_name_from_path("plain"), "plain");
    }
}

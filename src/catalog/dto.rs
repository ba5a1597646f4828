use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FoodSearch {
    #[serde(default)]
    pub search: Option<String>,
}

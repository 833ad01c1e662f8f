use uuid::Uuid;

/// Correlation ID that follows one poll cycle through the pipeline
/// (gate → fetch → enrich → aggregate → append).
#[derive(Clone, Debug)]
pub struct CycleId(Uuid);

impl CycleId {
    pub fn as_string(&self) -> String {
        self.0.as_hyphenated().to_string()
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self(Uuid::new_v4())
    }
}

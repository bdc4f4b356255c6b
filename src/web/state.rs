use crate::{Config, assistant::StudyAssistant, model::ModelManager};

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    assistant: StudyAssistant,
    config: &'static Config,
}

impl AppState {
    pub fn new(mm: ModelManager, config: &'static Config) -> Self {
        Self {
            mm,
            assistant: StudyAssistant::new(config.assistant()),
            config,
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn assistant(&self) -> &StudyAssistant {
        &self.assistant
    }

    pub fn config(&self) -> &'static Config {
        self.config
    }

    pub fn pass_threshold(&self) -> f64 {
        self.config.app().pass_threshold()
    }
}

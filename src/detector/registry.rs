use tracing::{info, warn};

use super::{
    ConfigError, MediaTester, MountRetry, Rules, Section,
    testers::{CdTester, DvdTester, FileTester, TYPE_KEY},
};

/// Tester prototypes plus the instances bound to rules sections.
pub struct TesterRegistry {
    prototypes: Vec<Box<dyn MediaTester>>,
    registered: Vec<Box<dyn MediaTester>>,
}

impl TesterRegistry {
    /// Registry over the given prototypes, with nothing registered yet.
    pub fn new(prototypes: Vec<Box<dyn MediaTester>>) -> Self {
        Self {
            prototypes,
            registered: Vec::new(),
        }
    }

    /// Registry with the compiled-in CD, DVD and file testers.
    pub fn with_builtin(retry: MountRetry) -> Self {
        Self::new(vec![
            Box::new(CdTester::new()),
            Box::new(DvdTester::new()),
            Box::new(FileTester::new(retry)),
        ])
    }

    /// Registers every non-`GLOBAL` section in file order.
    ///
    /// # Errors
    /// Stops at the first section that fails to bind.
    pub fn register_rules(&mut self, rules: &Rules) -> Result<(), ConfigError> {
        for section in rules.sections().filter(|s| !s.is_global()) {
            self.register_section(section)?;
        }
        if self.registered.is_empty() {
            warn!("No tester sections configured, nothing will ever match");
        }
        Ok(())
    }

    /// Creates and configures one instance per prototype whose type matches
    /// the section's `TYPE`. Returns how many were registered.
    ///
    /// # Errors
    /// `ConfigError::MissingKey` without `TYPE`, `ConfigError::UnknownType`
    /// if no prototype matches, or whatever the tester's own validation
    /// reports.
    pub fn register_section(&mut self, section: &Section) -> Result<usize, ConfigError> {
        let tester_type = section
            .single_value(TYPE_KEY)?
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.name().to_string(),
                key: TYPE_KEY.to_string(),
            })?;

        let mut count = 0;
        for prototype in self.prototypes.iter().filter(|p| p.type_matches(tester_type)) {
            let mut tester = prototype.create();
            tester.load_config(section)?;
            info!(
                section = section.name(),
                tester = tester.description(),
                "Tester registered"
            );
            self.registered.push(tester);
            count += 1;
        }

        if count == 0 {
            return Err(ConfigError::UnknownType {
                section: section.name().to_string(),
                tester_type: tester_type.to_string(),
            });
        }
        Ok(count)
    }

    /// One instance per tester type, targets of the scan hooks.
    pub fn prototypes(&self) -> &[Box<dyn MediaTester>] {
        &self.prototypes
    }

    pub(crate) fn prototypes_mut(&mut self) -> &mut [Box<dyn MediaTester>] {
        &mut self.prototypes
    }

    /// Classification candidates in registration order.
    pub fn registered(&self) -> &[Box<dyn MediaTester>] {
        &self.registered
    }
}

impl std::fmt::Debug for TesterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |testers: &[Box<dyn MediaTester>]| {
            testers
                .iter()
                .map(|t| t.type_tag().to_string())
                .collect::<Vec<_>>()
        };
        f.debug_struct("TesterRegistry")
            .field("prototypes", &names(&self.prototypes))
            .field("registered", &names(&self.registered))
            .finish()
    }
}

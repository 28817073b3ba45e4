//! pre-flight bundle checks
//!
//! The translation core assumes a structurally sound bundle and fails fast on
//! the first dangling reference it hits. Run [validate] first to collect
//! everything wrong with a document in one pass instead.
use crate::bundle::Bundle;
use crate::placement::Dialect;

/// Check a decoded bundle against the rules the decoder cannot express.
pub fn validate(bundle: &Bundle) -> Result<(), BundleIssues> {
    let mut e = BundleIssues::new();
    let dialect = Dialect::of(bundle);

    for (service_name, service) in &bundle.services {
        if service.charm.is_empty() {
            e.log(Issue::EmptyCharm {
                service: service_name.clone(),
            });
        }

        let directives = service.placement_directives();
        if directives.len() > service.num_units as usize {
            e.log(Issue::ExtraPlacements {
                service: service_name.clone(),
            });
        }

        for token in &directives {
            let placement = dialect.parse_placement(token);

            if !placement.service.is_empty() && !bundle.services.contains_key(&placement.service) {
                e.log(Issue::UnknownServiceTarget {
                    service: service_name.clone(),
                    target: placement.service,
                });
            }

            if dialect.machine_placement() && !placement.machine.is_empty() {
                let known = bundle
                    .machines
                    .as_ref()
                    .is_some_and(|machines| machines.contains_key(&placement.machine));
                if !known {
                    e.log(Issue::UnknownMachineTarget {
                        service: service_name.clone(),
                        target: placement.machine,
                    });
                }
            }
        }
    }

    if e.issues.is_empty() {
        Ok(())
    } else {
        Err(e)
    }
}

/// All issues found in one validation pass.
#[derive(derive_new::new, Debug)]
pub struct BundleIssues {
    #[new(default)]
    issues: Vec<Issue>,
}

impl BundleIssues {
    fn log(&mut self, issue: Issue) {
        tracing::trace!(?issue, "issue found");
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl std::error::Error for BundleIssues {}

impl std::fmt::Display for BundleIssues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut issues = self.issues.iter();
        if let Some(first) = issues.next() {
            write!(f, "{first}")?;
        }
        for issue in issues {
            write!(f, "\n{issue}")?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Issue {
    #[error("service {service:?} has an empty charm reference")]
    EmptyCharm { service: String },
    #[error("service {service:?} has more placement directives than units")]
    ExtraPlacements { service: String },
    #[error("service {service:?} is placed next to unknown service {target:?}")]
    UnknownServiceTarget { service: String, target: String },
    #[error("service {service:?} is placed on unknown machine {target:?}")]
    UnknownMachineTarget { service: String, target: String },
}

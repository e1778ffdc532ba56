//! The four domain experts. Each contributes only its reviewer guidance;
//! evaluation mechanics live in the runner.

use crate::catalog::ModuleKind;
use crate::modules::DomainModule;

pub struct StructureModule;

impl DomainModule for StructureModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Structure
    }

    fn guidance(&self) -> &'static str {
        "You review the structural layout of a fund presentation: required slides \
         (title slide, fund identification, contact and legal entity details), slide \
         ordering, and completeness of mandatory sections. Judge presence and placement, \
         not prose quality."
    }
}

pub struct EsgModule;

impl DomainModule for EsgModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Esg
    }

    fn guidance(&self) -> &'static str {
        "You review environmental, social and governance claims in a fund presentation. \
         Watch for sustainability claims without substantiation, missing SFDR \
         classification where sustainability is promoted, and ESG terminology used for \
         funds that do not commit to it."
    }
}

pub struct DisclaimerModule;

impl DomainModule for DisclaimerModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Disclaimers
    }

    fn guidance(&self) -> &'static str {
        "You review required disclaimers and risk warnings in a fund presentation: \
         capital-at-risk warnings, past-performance caveats, audience-specific legal \
         notices, and jurisdiction-specific texts. A disclaimer present on the wrong \
         slide or materially abbreviated does not satisfy the rule."
    }
}

pub struct PerformanceModule;

impl DomainModule for PerformanceModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Performance
    }

    fn guidance(&self) -> &'static str {
        "You review performance presentation in a fund deck: period coverage, benchmark \
         attribution, net-versus-gross labelling, and simulated or back-tested figures. \
         Performance shown without the mandated context violates the relevant rule even \
         when the figures themselves are accurate."
    }
}

/// One instance of each domain, in canonical order.
pub fn default_modules() -> Vec<Box<dyn DomainModule>> {
    vec![
        Box::new(StructureModule),
        Box::new(EsgModule),
        Box::new(DisclaimerModule),
        Box::new(PerformanceModule),
    ]
}

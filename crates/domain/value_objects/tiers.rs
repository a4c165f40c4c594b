use std::fmt::Display;
use std::sync::LazyLock;

use serde::Serialize;

use super::capabilities::{CapabilityMatrix, CapabilityValue};
use super::resource_keys::ResourceKey;

/// Product tiers, lowest first. Plan names are classified against them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Basic,
    Professional,
    Premium,
}

impl Tier {
    pub const ORDERED: [Tier; 4] = [Tier::Free, Tier::Basic, Tier::Professional, Tier::Premium];

    pub fn keyword(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Professional => "professional",
            Tier::Premium => "premium",
        }
    }

    /// Case-insensitive substring match of the plan name against the tier
    /// keywords; the first keyword found wins and no match means `Free`.
    pub fn classify(plan_name: &str) -> Tier {
        let name = plan_name.to_lowercase();
        Self::ORDERED
            .into_iter()
            .find(|tier| name.contains(tier.keyword()))
            .unwrap_or(Tier::Free)
    }

    pub fn highest() -> Tier {
        Tier::Premium
    }

    /// Read-only base template. Callers clone before overlaying anything.
    pub fn base_template(&self) -> &'static CapabilityMatrix {
        &TIER_TEMPLATES[*self as usize]
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

static TIER_TEMPLATES: LazyLock<[CapabilityMatrix; 4]> = LazyLock::new(|| {
    [
        free_template(),
        basic_template(),
        professional_template(),
        premium_template(),
    ]
});

fn flag(value: bool) -> CapabilityValue {
    CapabilityValue::Flag(value)
}

fn limit(value: i64) -> CapabilityValue {
    CapabilityValue::Limit(value)
}

fn text(value: &str) -> CapabilityValue {
    CapabilityValue::Text(value.to_string())
}

fn free_template() -> CapabilityMatrix {
    CapabilityMatrix::new()
        .with(ResourceKey::TransacoesHabilitado, flag(true))
        .with(ResourceKey::TransacoesLimite, limit(50))
        .with(ResourceKey::ClientesHabilitado, flag(true))
        .with(ResourceKey::ClientesLimite, limit(20))
        .with(ResourceKey::UsuariosHabilitado, flag(true))
        .with(ResourceKey::UsuariosLimite, limit(1))
        .with(ResourceKey::RelatoriosHabilitado, flag(false))
        .with(ResourceKey::RelatoriosExportacao, flag(false))
        .with(ResourceKey::RelatoriosAvancados, flag(false))
        .with(ResourceKey::IntegracoesHabilitado, flag(false))
        .with(ResourceKey::IntegracoesGatewaysOnline, flag(false))
        .with(ResourceKey::IntegracoesApi, flag(false))
        .with(ResourceKey::SuporteHabilitado, flag(true))
        .with(ResourceKey::SuporteNivel, text("email"))
}

fn basic_template() -> CapabilityMatrix {
    CapabilityMatrix::new()
        .with(ResourceKey::TransacoesHabilitado, flag(true))
        .with(ResourceKey::TransacoesLimite, limit(500))
        .with(ResourceKey::ClientesHabilitado, flag(true))
        .with(ResourceKey::ClientesLimite, limit(200))
        .with(ResourceKey::UsuariosHabilitado, flag(true))
        .with(ResourceKey::UsuariosLimite, limit(3))
        .with(ResourceKey::RelatoriosHabilitado, flag(true))
        .with(ResourceKey::RelatoriosExportacao, flag(false))
        .with(ResourceKey::RelatoriosAvancados, flag(false))
        .with(ResourceKey::IntegracoesHabilitado, flag(false))
        .with(ResourceKey::IntegracoesGatewaysOnline, flag(false))
        .with(ResourceKey::IntegracoesApi, flag(false))
        .with(ResourceKey::SuporteHabilitado, flag(true))
        .with(ResourceKey::SuporteNivel, text("email"))
}

fn professional_template() -> CapabilityMatrix {
    CapabilityMatrix::new()
        .with(ResourceKey::TransacoesHabilitado, flag(true))
        .with(ResourceKey::TransacoesLimite, limit(5000))
        .with(ResourceKey::ClientesHabilitado, flag(true))
        .with(ResourceKey::ClientesLimite, CapabilityValue::Unlimited)
        .with(ResourceKey::UsuariosHabilitado, flag(true))
        .with(ResourceKey::UsuariosLimite, limit(10))
        .with(ResourceKey::RelatoriosHabilitado, flag(true))
        .with(ResourceKey::RelatoriosExportacao, flag(true))
        .with(ResourceKey::RelatoriosAvancados, flag(false))
        .with(ResourceKey::IntegracoesHabilitado, flag(true))
        .with(ResourceKey::IntegracoesGatewaysOnline, flag(true))
        .with(ResourceKey::IntegracoesApi, flag(false))
        .with(ResourceKey::SuporteHabilitado, flag(true))
        .with(ResourceKey::SuporteNivel, text("prioritario"))
}

fn premium_template() -> CapabilityMatrix {
    CapabilityMatrix::new()
        .with(ResourceKey::TransacoesHabilitado, flag(true))
        .with(ResourceKey::TransacoesLimite, CapabilityValue::Unlimited)
        .with(ResourceKey::ClientesHabilitado, flag(true))
        .with(ResourceKey::ClientesLimite, CapabilityValue::Unlimited)
        .with(ResourceKey::UsuariosHabilitado, flag(true))
        .with(ResourceKey::UsuariosLimite, CapabilityValue::Unlimited)
        .with(ResourceKey::RelatoriosHabilitado, flag(true))
        .with(ResourceKey::RelatoriosExportacao, flag(true))
        .with(ResourceKey::RelatoriosAvancados, flag(true))
        .with(ResourceKey::IntegracoesHabilitado, flag(true))
        .with(ResourceKey::IntegracoesGatewaysOnline, flag(true))
        .with(ResourceKey::IntegracoesApi, flag(true))
        .with(ResourceKey::SuporteHabilitado, flag(true))
        .with(ResourceKey::SuporteNivel, text("dedicado"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plan_names_case_insensitively() {
        assert_eq!(Tier::classify("Plano Basic Mensal"), Tier::Basic);
        assert_eq!(Tier::classify("PROFESSIONAL"), Tier::Professional);
        assert_eq!(Tier::classify("premium anual"), Tier::Premium);
        assert_eq!(Tier::classify("Free"), Tier::Free);
    }

    #[test]
    fn unknown_plan_names_default_to_free() {
        assert_eq!(Tier::classify("Enterprise"), Tier::Free);
        assert_eq!(Tier::classify(""), Tier::Free);
    }

    #[test]
    fn earlier_keywords_win() {
        assert_eq!(Tier::classify("Basic to Premium bridge"), Tier::Basic);
        assert_eq!(Tier::classify("free premium trial"), Tier::Free);
    }

    #[test]
    fn every_template_defines_every_resource() {
        for tier in Tier::ORDERED {
            let template = tier.base_template();
            for key in ResourceKey::ALL {
                assert!(
                    template.value_of(key).is_some(),
                    "{tier} template is missing {key}"
                );
            }
        }
    }

    #[test]
    fn premium_has_unlimited_transactions() {
        assert_eq!(
            Tier::highest().base_template().value_of(ResourceKey::TransacoesLimite),
            Some(&CapabilityValue::Unlimited)
        );
    }
}

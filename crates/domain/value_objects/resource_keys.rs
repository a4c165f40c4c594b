use std::fmt::Display;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Product modules that can be gated per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Module {
    Transacoes,
    Clientes,
    Usuarios,
    Relatorios,
    Integracoes,
    Suporte,
}

impl Module {
    pub const ALL: [Module; 6] = [
        Module::Transacoes,
        Module::Clientes,
        Module::Usuarios,
        Module::Relatorios,
        Module::Integracoes,
        Module::Suporte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Transacoes => "transacoes",
            Module::Clientes => "clientes",
            Module::Usuarios => "usuarios",
            Module::Relatorios => "relatorios",
            Module::Integracoes => "integracoes",
            Module::Suporte => "suporte",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|module| module.as_str() == value)
    }

    /// The `<module>.habilitado` flag that decides module-level access.
    pub fn access_key(&self) -> ResourceKey {
        match self {
            Module::Transacoes => ResourceKey::TransacoesHabilitado,
            Module::Clientes => ResourceKey::ClientesHabilitado,
            Module::Usuarios => ResourceKey::UsuariosHabilitado,
            Module::Relatorios => ResourceKey::RelatoriosHabilitado,
            Module::Integracoes => ResourceKey::IntegracoesHabilitado,
            Module::Suporte => ResourceKey::SuporteHabilitado,
        }
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every gateable `module.property` pair known to the product.
///
/// Resource rows are mapped onto this enumeration once, when the catalog is
/// loaded; a dotted key with no variant here is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKey {
    TransacoesHabilitado,
    TransacoesLimite,
    ClientesHabilitado,
    ClientesLimite,
    UsuariosHabilitado,
    UsuariosLimite,
    RelatoriosHabilitado,
    RelatoriosExportacao,
    RelatoriosAvancados,
    IntegracoesHabilitado,
    IntegracoesGatewaysOnline,
    IntegracoesApi,
    SuporteHabilitado,
    SuporteNivel,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 14] = [
        ResourceKey::TransacoesHabilitado,
        ResourceKey::TransacoesLimite,
        ResourceKey::ClientesHabilitado,
        ResourceKey::ClientesLimite,
        ResourceKey::UsuariosHabilitado,
        ResourceKey::UsuariosLimite,
        ResourceKey::RelatoriosHabilitado,
        ResourceKey::RelatoriosExportacao,
        ResourceKey::RelatoriosAvancados,
        ResourceKey::IntegracoesHabilitado,
        ResourceKey::IntegracoesGatewaysOnline,
        ResourceKey::IntegracoesApi,
        ResourceKey::SuporteHabilitado,
        ResourceKey::SuporteNivel,
    ];

    pub fn module(&self) -> Module {
        match self {
            ResourceKey::TransacoesHabilitado | ResourceKey::TransacoesLimite => Module::Transacoes,
            ResourceKey::ClientesHabilitado | ResourceKey::ClientesLimite => Module::Clientes,
            ResourceKey::UsuariosHabilitado | ResourceKey::UsuariosLimite => Module::Usuarios,
            ResourceKey::RelatoriosHabilitado
            | ResourceKey::RelatoriosExportacao
            | ResourceKey::RelatoriosAvancados => Module::Relatorios,
            ResourceKey::IntegracoesHabilitado
            | ResourceKey::IntegracoesGatewaysOnline
            | ResourceKey::IntegracoesApi => Module::Integracoes,
            ResourceKey::SuporteHabilitado | ResourceKey::SuporteNivel => Module::Suporte,
        }
    }

    pub fn property(&self) -> &'static str {
        match self {
            ResourceKey::TransacoesHabilitado
            | ResourceKey::ClientesHabilitado
            | ResourceKey::UsuariosHabilitado
            | ResourceKey::RelatoriosHabilitado
            | ResourceKey::IntegracoesHabilitado
            | ResourceKey::SuporteHabilitado => "habilitado",
            ResourceKey::TransacoesLimite
            | ResourceKey::ClientesLimite
            | ResourceKey::UsuariosLimite => "limite",
            ResourceKey::RelatoriosExportacao => "exportacao",
            ResourceKey::RelatoriosAvancados => "avancados",
            ResourceKey::IntegracoesGatewaysOnline => "gateways_online",
            ResourceKey::IntegracoesApi => "api",
            ResourceKey::SuporteNivel => "nivel",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKey::TransacoesHabilitado => "transacoes.habilitado",
            ResourceKey::TransacoesLimite => "transacoes.limite",
            ResourceKey::ClientesHabilitado => "clientes.habilitado",
            ResourceKey::ClientesLimite => "clientes.limite",
            ResourceKey::UsuariosHabilitado => "usuarios.habilitado",
            ResourceKey::UsuariosLimite => "usuarios.limite",
            ResourceKey::RelatoriosHabilitado => "relatorios.habilitado",
            ResourceKey::RelatoriosExportacao => "relatorios.exportacao",
            ResourceKey::RelatoriosAvancados => "relatorios.avancados",
            ResourceKey::IntegracoesHabilitado => "integracoes.habilitado",
            ResourceKey::IntegracoesGatewaysOnline => "integracoes.gateways_online",
            ResourceKey::IntegracoesApi => "integracoes.api",
            ResourceKey::SuporteHabilitado => "suporte.habilitado",
            ResourceKey::SuporteNivel => "suporte.nivel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized resource key: {0}")]
pub struct UnknownResourceKey(pub String);

impl FromStr for ResourceKey {
    type Err = UnknownResourceKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == trimmed)
            .ok_or_else(|| UnknownResourceKey(value.to_string()))
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_is_module_dot_property() {
        for key in ResourceKey::ALL {
            assert_eq!(
                key.as_str(),
                format!("{}.{}", key.module().as_str(), key.property())
            );
            assert_eq!(key.as_str().parse::<ResourceKey>(), Ok(key));
        }
    }

    #[test]
    fn rejects_unknown_and_malformed_keys() {
        assert!("transacoes.maximo".parse::<ResourceKey>().is_err());
        assert!("transacoes".parse::<ResourceKey>().is_err());
        assert!("".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn module_access_key_belongs_to_module() {
        for module in Module::ALL {
            assert_eq!(module.access_key().module(), module);
            assert_eq!(module.access_key().property(), "habilitado");
        }
    }
}

//! Canonical role resolution.
//!
//! Role claims arrive in every shape the system has ever minted: plain
//! strings (`"admin"`), prefixed tokens (`"ROLE_DELEGACION"`), accented
//! Spanish (`"delegación"`), legacy numeric ids, arrays, scope strings, and
//! nested objects. This module is the single place that flattens all of
//! them into [`Rol`]; no resource operation does its own string matching.
//!
//! Resolution is a pure function of the principal: it never fails, never
//! logs, and never panics. Malformed claims degrade to [`Rol::Desconocido`]
//! or are dropped, which downstream policy treats as "no permission".

use std::collections::BTreeSet;

use crate::principal::{ClaimRol, Principal};

/// Canonical role taxonomy.
///
/// The first seven variants are the roles the business knows about. Anything
/// that normalizes to none of them is preserved as [`Rol::Desconocido`] with
/// the lowercased token, so unknown roles stay visible in logs instead of
/// disappearing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rol {
    /// Universal bypass: full read and write access, no scoping.
    Admin,
    /// A regional office. Scoped to its own delegation.
    Delegacion,
    /// Oversight role; read-privileged on document resources.
    Control,
    /// Audit role; read-privileged on document resources.
    Auditor,
    /// Collections role; scoped like a delegation but may act on behalf of
    /// another delegation on document writes.
    Recaudacion,
    /// Head office; read-privileged on document resources.
    Central,
    /// Forestry office role. Recognized but granted nothing by default.
    Bosques,
    /// Unrecognized role, lowercased and passed through.
    Desconocido(String),
}

/// Resolves a principal's raw claims into its canonical role set.
///
/// # Examples
///
/// ```
/// use guias_core::{resolver_roles, Principal, Rol};
///
/// let p = Principal::con_rol("ROLE_Delegación", Some(7));
/// let roles = resolver_roles(&p);
/// assert!(roles.contains(&Rol::Delegacion));
/// ```
pub fn resolver_roles(principal: &Principal) -> BTreeSet<Rol> {
    let mut roles = BTreeSet::new();
    for claim in &principal.claims {
        match claim {
            ClaimRol::Texto(s) => agregar_tokens(&mut roles, s),
            ClaimRol::Lista(xs) => {
                for s in xs {
                    agregar_tokens(&mut roles, s);
                }
            }
            ClaimRol::Legado(id) => {
                if let Some(rol) = rol_por_id_legado(*id) {
                    roles.insert(rol);
                } else {
                    roles.insert(Rol::Desconocido(id.to_string()));
                }
            }
            ClaimRol::Objeto { id, descripcion } => {
                // id wins over description when both are present
                if let Some(rol) = id.and_then(rol_por_id_legado) {
                    roles.insert(rol);
                } else if let Some(d) = descripcion {
                    agregar_tokens(&mut roles, d);
                } else if let Some(id) = id {
                    roles.insert(Rol::Desconocido(id.to_string()));
                }
            }
        }
    }
    roles
}

/// Legacy numeric role ids, frozen from the roles table.
fn rol_por_id_legado(id: u32) -> Option<Rol> {
    match id {
        2 => Some(Rol::Admin),
        3 => Some(Rol::Delegacion),
        4 => Some(Rol::Control),
        5 => Some(Rol::Auditor),
        6 => Some(Rol::Recaudacion),
        _ => None,
    }
}

/// Splits a raw claim string on commas/whitespace (scope-list tokens) and
/// normalizes each piece.
fn agregar_tokens(roles: &mut BTreeSet<Rol>, crudo: &str) {
    for token in crudo.split([',', ' ', '\t', '\n']) {
        if let Some(rol) = normalizar_token(token) {
            roles.insert(rol);
        }
    }
}

/// Normalization pipeline for one raw token.
///
/// trim → lowercase → strip diacritics → strip `role`/`role_`/`role:`/`role-`
/// prefix → legacy numeric id → residual prefix patterns → `Desconocido`.
/// Empty tokens resolve to `None`.
fn normalizar_token(crudo: &str) -> Option<Rol> {
    let bajo = sin_acentos(crudo.trim()).to_lowercase();
    let token = quitar_prefijo_role(&bajo);
    if token.is_empty() {
        return None;
    }

    if let Ok(id) = token.parse::<u32>() {
        return Some(rol_por_id_legado(id).unwrap_or_else(|| Rol::Desconocido(token.to_string())));
    }

    let rol = if token.starts_with("admin") {
        Rol::Admin
    } else if token.starts_with("deleg") {
        Rol::Delegacion
    } else if token.contains("recaud") {
        Rol::Recaudacion
    } else if token.starts_with("control") {
        Rol::Control
    } else if token.starts_with("auditor") {
        Rol::Auditor
    } else if token.contains("central") {
        Rol::Central
    } else if token.starts_with("bosq") {
        Rol::Bosques
    } else {
        Rol::Desconocido(token.to_string())
    };
    Some(rol)
}

/// Strips one leading `role` token with an optional `_`, `:` or `-` joiner.
fn quitar_prefijo_role(token: &str) -> &str {
    match token.strip_prefix("role") {
        Some(resto) => resto.trim_start_matches(['_', ':', '-']),
        None => token,
    }
}

/// Folds the Spanish diacritics that appear in role and folder names.
pub(crate) fn sin_acentos(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'Ñ' => 'N',
            otro => otro,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solo(claim: ClaimRol) -> BTreeSet<Rol> {
        resolver_roles(&Principal {
            usuario_id: None,
            claims: vec![claim],
            delegacion_id: None,
        })
    }

    #[test]
    fn string_claim_normalizes() {
        assert!(solo(ClaimRol::Texto("  Admin ".into())).contains(&Rol::Admin));
        assert!(solo(ClaimRol::Texto("delegación".into())).contains(&Rol::Delegacion));
        assert!(solo(ClaimRol::Texto("RECAUDACIÓN".into())).contains(&Rol::Recaudacion));
    }

    #[test]
    fn legacy_prefix_is_stripped() {
        assert!(solo(ClaimRol::Texto("ROLE_ADMIN".into())).contains(&Rol::Admin));
        assert!(solo(ClaimRol::Texto("role:deleg".into())).contains(&Rol::Delegacion));
        assert!(solo(ClaimRol::Texto("role-auditor".into())).contains(&Rol::Auditor));
        assert!(solo(ClaimRol::Texto("roleadmin".into())).contains(&Rol::Admin));
    }

    #[test]
    fn residual_prefixes_match() {
        assert!(solo(ClaimRol::Texto("administrador".into())).contains(&Rol::Admin));
        assert!(solo(ClaimRol::Texto("delegacion-sur".into())).contains(&Rol::Delegacion));
        assert!(solo(ClaimRol::Texto("jefe-recaudacion".into())).contains(&Rol::Recaudacion));
        assert!(solo(ClaimRol::Texto("control".into())).contains(&Rol::Control));
        assert!(solo(ClaimRol::Texto("auditoria".into())).contains(&Rol::Auditor));
        assert!(solo(ClaimRol::Texto("casa central".into())).contains(&Rol::Central));
        assert!(solo(ClaimRol::Texto("bosques".into())).contains(&Rol::Bosques));
    }

    #[test]
    fn legacy_numeric_ids_map() {
        assert!(solo(ClaimRol::Legado(2)).contains(&Rol::Admin));
        assert!(solo(ClaimRol::Legado(3)).contains(&Rol::Delegacion));
        assert!(solo(ClaimRol::Legado(4)).contains(&Rol::Control));
        assert!(solo(ClaimRol::Legado(5)).contains(&Rol::Auditor));
        assert!(solo(ClaimRol::Legado(6)).contains(&Rol::Recaudacion));
        assert_eq!(
            solo(ClaimRol::Legado(99)),
            BTreeSet::from([Rol::Desconocido("99".into())])
        );
    }

    #[test]
    fn numeric_strings_use_the_legacy_map() {
        assert!(solo(ClaimRol::Texto("3".into())).contains(&Rol::Delegacion));
    }

    #[test]
    fn nested_object_prefers_id_over_description() {
        let roles = solo(ClaimRol::Objeto {
            id: Some(2),
            descripcion: Some("delegacion".into()),
        });
        assert_eq!(roles, BTreeSet::from([Rol::Admin]));
    }

    #[test]
    fn nested_object_falls_back_to_description() {
        let roles = solo(ClaimRol::Objeto {
            id: None,
            descripcion: Some("Auditoría".into()),
        });
        assert_eq!(roles, BTreeSet::from([Rol::Auditor]));
    }

    #[test]
    fn scope_string_splits_into_tokens() {
        let roles = solo(ClaimRol::Texto("delegacion, recaudacion admin".into()));
        assert!(roles.contains(&Rol::Delegacion));
        assert!(roles.contains(&Rol::Recaudacion));
        assert!(roles.contains(&Rol::Admin));
    }

    #[test]
    fn unknown_passes_through_lowercased() {
        assert_eq!(
            solo(ClaimRol::Texto("Mesa-De-Entrada".into())),
            BTreeSet::from([Rol::Desconocido("mesa-de-entrada".into())])
        );
    }

    #[test]
    fn empty_and_blank_claims_resolve_to_nothing() {
        assert!(solo(ClaimRol::Texto("".into())).is_empty());
        assert!(solo(ClaimRol::Texto("  , ,  ".into())).is_empty());
        assert!(solo(ClaimRol::Lista(vec![])).is_empty());
        assert!(resolver_roles(&Principal::default()).is_empty());
    }

    #[test]
    fn list_claims_accumulate() {
        let roles = solo(ClaimRol::Lista(vec!["admin".into(), "control".into()]));
        assert_eq!(roles, BTreeSet::from([Rol::Admin, Rol::Control]));
    }

    #[test]
    fn bare_role_prefix_is_dropped() {
        // "role_" with nothing behind it is an empty token, not a role.
        assert!(solo(ClaimRol::Texto("role_".into())).is_empty());
    }
}

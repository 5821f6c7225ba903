//! Access decisions.
//!
//! One [`AccessPolicy`] is built at startup and consulted by the scoping
//! middleware for every operation. No resource handler re-implements its own
//! role check; the admin bypass lives here and nowhere else.

use std::collections::BTreeSet;

use crate::roles::Rol;
use crate::scope::ScopeCtx;

/// A resource the policy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Recurso {
    /// Guía documents.
    Guias,
    /// Remito documents.
    Remitos,
    /// The paginated reporting view over both document types.
    ControlGeneral,
    /// The unified document listing.
    Documentos,
    /// Regional offices.
    Delegaciones,
    /// Document holders.
    Titulares,
    /// Delivery batches.
    Entregas,
}

impl Recurso {
    /// Whether rows of this resource are owned by a delegation and subject
    /// to the visibility predicate. Catalog resources (delegaciones,
    /// titulares) and delivery batches are not.
    pub fn con_scope(&self) -> bool {
        matches!(
            self,
            Recurso::Guias | Recurso::Remitos | Recurso::ControlGeneral | Recurso::Documentos
        )
    }

    fn etiqueta(&self) -> &'static str {
        match self {
            Recurso::Guias => "guias",
            Recurso::Remitos => "remitos",
            Recurso::ControlGeneral => "control-general",
            Recurso::Documentos => "documentos",
            Recurso::Delegaciones => "delegaciones",
            Recurso::Titulares => "titulares",
            Recurso::Entregas => "entregas",
        }
    }
}

/// Read- or write-class action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Accion {
    /// Read-class operation.
    Leer,
    /// Write-class operation (create, update, link, attach, delete).
    Escribir,
}

impl Accion {
    fn etiqueta(&self) -> &'static str {
        match self {
            Accion::Leer => "leer",
            Accion::Escribir => "escribir",
        }
    }
}

/// A requested operation: resource plus action class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Operacion {
    /// Target resource.
    pub recurso: Recurso,
    /// Action class.
    pub accion: Accion,
}

impl Operacion {
    /// A read on `recurso`.
    pub fn leer(recurso: Recurso) -> Self {
        Self {
            recurso,
            accion: Accion::Leer,
        }
    }

    /// A write on `recurso`.
    pub fn escribir(recurso: Recurso) -> Self {
        Self {
            recurso,
            accion: Accion::Escribir,
        }
    }

    /// `recurso:accion` tag used in forbidden responses and logs.
    pub fn etiqueta(&self) -> String {
        format!("{}:{}", self.recurso.etiqueta(), self.accion.etiqueta())
    }
}

/// Why a decision denied the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denegacion {
    /// Resolved roles do not satisfy the operation's required role set.
    SinPermiso,
    /// Caller would be allowed, but no delegation id could be resolved for
    /// a scoped resource. Distinct from a plain permission failure.
    DelegacionSinResolver,
}

/// Outcome of [`AccessPolicy::decidir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Operation allowed, with the scoping context to apply.
    Permitido(ScopeCtx),
    /// Operation denied.
    Denegado(Denegacion),
}

impl Decision {
    /// Converts into a `Result`, mapping denials onto the error taxonomy.
    pub fn a_resultado(self, op: Operacion) -> crate::error::Result<ScopeCtx> {
        match self {
            Decision::Permitido(scope) => Ok(scope),
            Decision::Denegado(Denegacion::DelegacionSinResolver) => {
                Err(crate::error::Error::DelegacionSinResolver)
            }
            Decision::Denegado(Denegacion::SinPermiso) => Err(crate::error::Error::Forbidden {
                info: op.etiqueta(),
            }),
        }
    }
}

/// The access policy: required-role table plus the read-privilege allow-list.
///
/// Decisions are pure and deterministic. Role evaluation is set-based and
/// order-independent, with one exception fixed by design: the admin bypass
/// is evaluated first and short-circuits every other rule.
///
/// # Examples
///
/// ```
/// use guias_core::{AccessPolicy, Decision, Operacion, Recurso, Rol};
/// use std::collections::BTreeSet;
///
/// let policy = AccessPolicy::protegida();
/// let roles = BTreeSet::from([Rol::Admin]);
/// let decision = policy.decidir(&roles, Operacion::escribir(Recurso::Guias), None);
/// assert!(matches!(decision, Decision::Permitido(s) if s.privilegiado));
/// ```
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    protegido: bool,
    lecturas_privilegiadas: BTreeSet<(Recurso, Accion, Rol)>,
}

impl AccessPolicy {
    /// Policy with role enforcement on and the default privilege table.
    pub fn protegida() -> Self {
        let mut lecturas = BTreeSet::new();
        for recurso in [
            Recurso::Guias,
            Recurso::Remitos,
            Recurso::ControlGeneral,
            Recurso::Documentos,
        ] {
            for rol in [Rol::Control, Rol::Auditor, Rol::Central] {
                lecturas.insert((recurso, Accion::Leer, rol));
            }
        }
        Self {
            protegido: true,
            lecturas_privilegiadas: lecturas,
        }
    }

    /// Development-mode policy: no role requirements, full access.
    pub fn abierta() -> Self {
        Self {
            protegido: false,
            lecturas_privilegiadas: BTreeSet::new(),
        }
    }

    /// Adds an entry to the privilege allow-list. Write-class entries are
    /// possible but never part of the default table.
    pub fn con_privilegio(mut self, recurso: Recurso, accion: Accion, rol: Rol) -> Self {
        self.lecturas_privilegiadas.insert((recurso, accion, rol));
        self
    }

    /// Whether role enforcement is active.
    pub fn protegido(&self) -> bool {
        self.protegido
    }

    /// Decides whether `roles` may perform `op`, and under which scope.
    ///
    /// `reclamada` is the delegation id claimed by the caller's credential,
    /// if any. Rule order:
    ///
    /// 1. admin → allowed, privileged, may redirect (short-circuits);
    /// 2. unprotected policy → allowed, full access;
    /// 3. required-role overlap, else denied;
    /// 4. privilege allow-list → allowed, privileged reads, no redirect;
    /// 5. scoped resource → delegation claim required, redirect granted to
    ///    recaudación on writes; catalog resource → allowed unscoped.
    pub fn decidir(
        &self,
        roles: &BTreeSet<Rol>,
        op: Operacion,
        reclamada: Option<i64>,
    ) -> Decision {
        if roles.contains(&Rol::Admin) {
            return Decision::Permitido(ScopeCtx::total());
        }
        if !self.protegido {
            return Decision::Permitido(ScopeCtx::total());
        }

        let requeridos = roles_requeridos(op);
        if !requeridos.is_empty() && !requeridos.iter().any(|r| roles.contains(r)) {
            return Decision::Denegado(Denegacion::SinPermiso);
        }

        if roles
            .iter()
            .any(|r| self.lecturas_privilegiadas.contains(&(op.recurso, op.accion, r.clone())))
        {
            return Decision::Permitido(ScopeCtx::lectura_privilegiada());
        }

        if op.recurso.con_scope() {
            match reclamada {
                Some(id) => Decision::Permitido(ScopeCtx {
                    privilegiado: false,
                    delegacion: Some(id),
                    puede_redirigir: roles.contains(&Rol::Recaudacion)
                        && op.accion == Accion::Escribir,
                }),
                None => Decision::Denegado(Denegacion::DelegacionSinResolver),
            }
        } else {
            Decision::Permitido(ScopeCtx {
                privilegiado: false,
                delegacion: reclamada,
                puede_redirigir: false,
            })
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::protegida()
    }
}

/// Required-role table, applied uniformly to every operation.
fn roles_requeridos(op: Operacion) -> &'static [Rol] {
    use Accion::{Escribir, Leer};
    use Recurso::*;

    const LECTURA_DOCS: &[Rol] = &[
        Rol::Delegacion,
        Rol::Admin,
        Rol::Control,
        Rol::Auditor,
        Rol::Central,
    ];
    const ESCRITURA_DOCS: &[Rol] = &[Rol::Delegacion, Rol::Admin, Rol::Recaudacion];

    match (op.recurso, op.accion) {
        (Guias | Remitos | Documentos, Leer) => LECTURA_DOCS,
        (Guias | Remitos, Escribir) => ESCRITURA_DOCS,
        (ControlGeneral, Leer) => &[Rol::Admin, Rol::Central, Rol::Control, Rol::Auditor],
        (Delegaciones, Leer) => &[Rol::Admin, Rol::Central, Rol::Recaudacion, Rol::Control],
        (Delegaciones, Escribir) => &[Rol::Admin],
        (Titulares, Leer) => &[Rol::Delegacion, Rol::Admin, Rol::Control, Rol::Auditor],
        (Titulares, Escribir) => &[Rol::Admin, Rol::Control],
        (Entregas, Escribir) => &[Rol::Admin, Rol::Central],
        // no read surface is defined for these; admin-only if ever routed
        (Documentos | ControlGeneral, Escribir) | (Entregas, Leer) => &[Rol::Admin],
    }
}

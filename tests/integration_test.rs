//! End-to-end scoping flows over an in-memory datastore.

use guias_core::fields::{GuiaDraft, GuiaPatch, RemitoDraft, RemitoPatch};
use guias_core::repo::{delegaciones, documentos, guias, remitos};
use guias_core::repo::guias::GuiaFiltro;
use guias_core::repo::remitos::RemitoFiltro;
use guias_core::web::{resolver_scope, RequestAdapter};
use guias_core::{schema, AccessPolicy, Error, Operacion, Principal, Recurso, ScopeCtx};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn pool_con_esquema() -> SqlitePool {
    // One connection so every handle sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("pool en memoria");
    schema::aplicar(&pool).await.expect("esquema");
    pool
}

async fn sembrar_delegaciones(pool: &SqlitePool) -> (i64, i64) {
    let a = delegaciones::crear(pool, "San Vicente", "sv@example.com")
        .await
        .unwrap();
    let b = delegaciones::crear(pool, "Montecarlo", "mc@example.com")
        .await
        .unwrap();
    (a, b)
}

fn draft(numero: &str) -> GuiaDraft {
    GuiaDraft {
        numero: Some(numero.to_string()),
        ..Default::default()
    }
}

fn draft_remito(numero: &str) -> RemitoDraft {
    RemitoDraft {
        numero: Some(numero.to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Scoped uniqueness
// ============================================================================

#[tokio::test]
async fn same_number_under_two_delegations_coexists() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    let id_a = guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("100"))
        .await
        .unwrap();
    let id_b = guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("100"))
        .await
        .unwrap();
    assert_ne!(id_a, id_b);

    // Third create in an occupied bucket conflicts.
    let err = guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("100"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflicto));
    assert_eq!(err.status(), 409);
}

#[tokio::test]
async fn orphan_bucket_holds_one_number() {
    let pool = pool_con_esquema().await;
    sembrar_delegaciones(&pool).await;
    let admin = ScopeCtx::total();

    guias::crear(&pool, &admin, draft("55")).await.unwrap();
    let err = guias::crear(&pool, &admin, draft("55")).await.unwrap_err();
    assert!(matches!(err, Error::Conflicto));
}

#[tokio::test]
async fn remito_numbers_follow_the_same_rule() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    remitos::crear(&pool, &ScopeCtx::de_delegacion(a), draft_remito("7"))
        .await
        .unwrap();
    remitos::crear(&pool, &ScopeCtx::de_delegacion(b), draft_remito("7"))
        .await
        .unwrap();
    let err = remitos::crear(&pool, &ScopeCtx::de_delegacion(b), draft_remito("7"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflicto));
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn scoped_listing_never_leaks_other_delegations() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;
    let admin = ScopeCtx::total();

    guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("1")).await.unwrap();
    guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("2")).await.unwrap();
    guias::crear(&pool, &admin, draft("3")).await.unwrap(); // orphan

    let visibles = guias::listar(&pool, &ScopeCtx::de_delegacion(a), &GuiaFiltro::default())
        .await
        .unwrap();
    assert_eq!(visibles.len(), 2); // own + orphan
    for guia in &visibles {
        assert!(guia.delegacion_id.is_none() || guia.delegacion_id == Some(a));
    }
}

#[tokio::test]
async fn privileged_listing_spans_delegations() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("1")).await.unwrap();
    guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("2")).await.unwrap();

    let todas = guias::listar(&pool, &ScopeCtx::total(), &GuiaFiltro::default())
        .await
        .unwrap();
    let delegs: std::collections::BTreeSet<_> =
        todas.iter().filter_map(|g| g.delegacion_id).collect();
    assert!(delegs.len() >= 2);

    let lectura = guias::listar(&pool, &ScopeCtx::lectura_privilegiada(), &GuiaFiltro::default())
        .await
        .unwrap();
    assert_eq!(lectura.len(), todas.len());
}

#[tokio::test]
async fn not_found_hides_other_delegations_rows() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    let ajena = guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("9"))
        .await
        .unwrap();

    let scope = ScopeCtx::de_delegacion(a);
    let existente = guias::por_id(&pool, &scope, ajena).await.unwrap_err();
    let inexistente = guias::por_id(&pool, &scope, 999_999).await.unwrap_err();

    // Same shape both ways: existence is not probeable.
    assert_eq!(existente.status(), inexistente.status());
    assert_eq!(existente.to_string(), inexistente.to_string());
}

// ============================================================================
// Claim semantics
// ============================================================================

#[tokio::test]
async fn orphan_is_claimed_on_first_write_touch() {
    let pool = pool_con_esquema().await;
    let (a, _) = sembrar_delegaciones(&pool).await;
    let admin = ScopeCtx::total();

    let id = guias::crear(&pool, &admin, draft("55")).await.unwrap();

    let patch = GuiaPatch {
        devuelta: Some(false),
        ..Default::default()
    };
    let resultado = guias::actualizar_parcial(&pool, &ScopeCtx::de_delegacion(a), id, patch)
        .await
        .unwrap();
    assert_eq!(resultado.cambiadas, 1);
    assert!(resultado.reclamada);

    let fila = guias::por_id(&pool, &admin, id).await.unwrap();
    assert_eq!(fila.delegacion_id, Some(a));
}

#[tokio::test]
async fn claim_race_has_exactly_one_winner() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;
    let admin = ScopeCtx::total();

    let id = guias::crear(&pool, &admin, draft("55")).await.unwrap();

    let patch = || GuiaPatch {
        informada: Some(true),
        ..Default::default()
    };
    let ctx_a = ScopeCtx::de_delegacion(a);
    let ctx_b = ScopeCtx::de_delegacion(b);
    let (ra, rb) = tokio::join!(
        guias::actualizar_parcial(&pool, &ctx_a, id, patch()),
        guias::actualizar_parcial(&pool, &ctx_b, id, patch()),
    );

    let fila = guias::por_id(&pool, &admin, id).await.unwrap();
    let ganadora = fila.delegacion_id.expect("el huérfano terminó reclamado");
    assert!(ganadora == a || ganadora == b);

    let reclamos = [&ra, &rb]
        .iter()
        .filter(|r| matches!(r, Ok(act) if act.reclamada))
        .count();
    assert_eq!(reclamos, 1, "exactamente una delegación gana el reclamo");

    for resultado in [&ra, &rb] {
        match resultado {
            Ok(act) if act.reclamada => {}
            // The loser either saw zero affected rows or no longer saw the row.
            Ok(act) => assert_eq!(act.cambiadas, 0),
            Err(err) => assert!(matches!(*err, Error::NotFound)),
        }
    }
}

#[tokio::test]
async fn owned_rows_are_never_reassigned_by_scoped_updates() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    let id = guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("70"))
        .await
        .unwrap();

    // Another delegation cannot even see the row.
    let patch = GuiaPatch {
        informada: Some(true),
        ..Default::default()
    };
    let err = guias::actualizar_parcial(&pool, &ScopeCtx::de_delegacion(b), id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound));

    let fila = guias::por_id(&pool, &ScopeCtx::total(), id).await.unwrap();
    assert_eq!(fila.delegacion_id, Some(a));
}

#[tokio::test]
async fn update_is_idempotent_on_owned_rows() {
    let pool = pool_con_esquema().await;
    let (a, _) = sembrar_delegaciones(&pool).await;
    let scope = ScopeCtx::de_delegacion(a);

    let id = guias::crear(&pool, &scope, draft("80")).await.unwrap();
    let patch = || GuiaPatch {
        devuelta: Some(true),
        titular: Some("Forestal SA".to_string()),
        ..Default::default()
    };

    guias::actualizar_parcial(&pool, &scope, id, patch()).await.unwrap();
    let primera = guias::por_id(&pool, &scope, id).await.unwrap();

    guias::actualizar_parcial(&pool, &scope, id, patch()).await.unwrap();
    let segunda = guias::por_id(&pool, &scope, id).await.unwrap();

    assert_eq!(primera.devuelta, segunda.devuelta);
    assert_eq!(primera.titular, segunda.titular);
    assert_eq!(primera.estado, segunda.estado);
    assert_eq!(primera.delegacion_id, segunda.delegacion_id);
    // Returned documents derive the inactive estado.
    assert_eq!(primera.estado, 4);
}

// ============================================================================
// Delegation overrides
// ============================================================================

#[tokio::test]
async fn recaudacion_may_act_on_behalf_of_another_delegation() {
    let pool = pool_con_esquema().await;
    let (propia, otra) = sembrar_delegaciones(&pool).await;
    let recaudacion = ScopeCtx {
        privilegiado: false,
        delegacion: Some(propia),
        puede_redirigir: true,
    };

    let mut draft = draft_remito("30");
    draft.delegacion_id = Some(otra);
    let id = remitos::crear(&pool, &recaudacion, draft).await.unwrap();

    let fila = remitos::por_id(&pool, &ScopeCtx::total(), id).await.unwrap();
    assert_eq!(fila.delegacion_id, Some(otra));
}

#[tokio::test]
async fn plain_delegacion_cannot_override_its_own_scope() {
    let pool = pool_con_esquema().await;
    let (propia, otra) = sembrar_delegaciones(&pool).await;

    let mut draft = draft("31");
    draft.delegacion_id = Some(otra);
    let id = guias::crear(&pool, &ScopeCtx::de_delegacion(propia), draft)
        .await
        .unwrap();

    let fila = guias::por_id(&pool, &ScopeCtx::total(), id).await.unwrap();
    assert_eq!(fila.delegacion_id, Some(propia));
}

#[tokio::test]
async fn ignored_override_alone_is_not_an_update() {
    let pool = pool_con_esquema().await;
    let (propia, otra) = sembrar_delegaciones(&pool).await;
    let scope = ScopeCtx::de_delegacion(propia);

    let id = guias::crear(&pool, &scope, draft("32")).await.unwrap();
    let patch = GuiaPatch {
        delegacion_id: Some(Some(otra)),
        ..Default::default()
    };
    let err = guias::actualizar_parcial(&pool, &scope, id, patch).await.unwrap_err();
    assert_eq!(err.status(), 400);
}

// ============================================================================
// Cross-link
// ============================================================================

#[tokio::test]
async fn link_claims_both_orphans_and_derives_the_number() {
    let pool = pool_con_esquema().await;
    let (a, _) = sembrar_delegaciones(&pool).await;
    let admin = ScopeCtx::total();

    let guia_id = guias::crear(&pool, &admin, draft("600")).await.unwrap();
    let remito_id = remitos::crear(&pool, &admin, draft_remito("601"))
        .await
        .unwrap();

    // A caller-supplied guia_numero is overwritten at link time.
    let scope = ScopeCtx::de_delegacion(a);
    let resultado = remitos::vincular_a_guia(&pool, &scope, remito_id, guia_id)
        .await
        .unwrap();
    assert_eq!(resultado.cambiadas, 1);
    assert!(resultado.remito_reclamado);
    assert!(resultado.guia_reclamada);

    let remito = remitos::por_id(&pool, &admin, remito_id).await.unwrap();
    assert_eq!(remito.guia_id, Some(guia_id));
    assert_eq!(remito.guia_numero.as_deref(), Some("600"));
    assert_eq!(remito.delegacion_id, Some(a));

    let guia = guias::por_id(&pool, &admin, guia_id).await.unwrap();
    assert_eq!(guia.delegacion_id, Some(a));
}

#[tokio::test]
async fn relinking_is_idempotent_and_overwrites_on_change() {
    let pool = pool_con_esquema().await;
    let (a, _) = sembrar_delegaciones(&pool).await;
    let scope = ScopeCtx::de_delegacion(a);

    let guia_1 = guias::crear(&pool, &scope, draft("610")).await.unwrap();
    let guia_2 = guias::crear(&pool, &scope, draft("611")).await.unwrap();
    let remito_id = remitos::crear(&pool, &scope, draft_remito("612"))
        .await
        .unwrap();

    remitos::vincular_a_guia(&pool, &scope, remito_id, guia_1).await.unwrap();
    remitos::vincular_a_guia(&pool, &scope, remito_id, guia_1).await.unwrap(); // no-op

    let remito = remitos::por_id(&pool, &scope, remito_id).await.unwrap();
    assert_eq!(remito.guia_id, Some(guia_1));

    remitos::vincular_a_guia(&pool, &scope, remito_id, guia_2).await.unwrap();
    let remito = remitos::por_id(&pool, &scope, remito_id).await.unwrap();
    assert_eq!(remito.guia_id, Some(guia_2));
    assert_eq!(remito.guia_numero.as_deref(), Some("611"));
}

#[tokio::test]
async fn link_distinguishes_missing_remito_from_foreign_guia() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;
    let scope = ScopeCtx::de_delegacion(a);

    let remito_id = remitos::crear(&pool, &scope, draft_remito("620"))
        .await
        .unwrap();
    let guia_ajena = guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("621"))
        .await
        .unwrap();

    let err = remitos::vincular_a_guia(&pool, &scope, 999_999, guia_ajena)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound));

    let err = remitos::vincular_a_guia(&pool, &scope, remito_id, guia_ajena)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::GuiaFueraDeAlcance));
}

#[tokio::test]
async fn caller_supplied_guia_numero_is_never_trusted() {
    let pool = pool_con_esquema().await;
    let (a, _) = sembrar_delegaciones(&pool).await;
    let scope = ScopeCtx::de_delegacion(a);

    let guia_id = guias::crear(&pool, &scope, draft("630")).await.unwrap();
    let remito_id = remitos::crear(&pool, &scope, draft_remito("631"))
        .await
        .unwrap();

    let patch = RemitoPatch {
        guia_numero: Some(Some("FALSO".to_string())),
        ..Default::default()
    };
    remitos::actualizar_parcial(&pool, &scope, remito_id, patch).await.unwrap();

    remitos::vincular_a_guia(&pool, &scope, remito_id, guia_id).await.unwrap();
    let remito = remitos::por_id(&pool, &scope, remito_id).await.unwrap();
    assert_eq!(remito.guia_numero.as_deref(), Some("630"));
}

// ============================================================================
// Middleware-to-repository flow
// ============================================================================

#[tokio::test]
async fn scoped_request_flows_end_to_end() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("1")).await.unwrap();
    guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("2")).await.unwrap();

    let policy = AccessPolicy::protegida();
    let mut adapter = RequestAdapter::new("req-900".to_string());
    adapter.set_principal(Some(Principal::con_rol("ROLE_DELEGACION", Some(a))));

    let scope = resolver_scope(&policy, &adapter, Operacion::leer(Recurso::Guias)).unwrap();
    let visibles = guias::listar(&pool, &scope, &GuiaFiltro::default()).await.unwrap();
    assert_eq!(visibles.len(), 1);
    assert_eq!(visibles[0].delegacion_id, Some(a));
}

#[tokio::test]
async fn unresolved_delegation_never_reaches_the_repository() {
    let policy = AccessPolicy::protegida();
    let mut adapter = RequestAdapter::new("req-901".to_string());
    adapter.set_principal(Some(Principal::con_rol("delegacion", None)));

    let err = resolver_scope(&policy, &adapter, Operacion::leer(Recurso::Guias)).unwrap_err();
    assert!(matches!(err, Error::DelegacionSinResolver));
}

// ============================================================================
// Listings and filters
// ============================================================================

#[tokio::test]
async fn claimable_listings_put_orphans_first() {
    let pool = pool_con_esquema().await;
    let (a, _) = sembrar_delegaciones(&pool).await;
    let admin = ScopeCtx::total();

    remitos::crear(&pool, &ScopeCtx::de_delegacion(a), draft_remito("10"))
        .await
        .unwrap();
    remitos::crear(&pool, &admin, draft_remito("11")).await.unwrap(); // orphan

    let filtro = RemitoFiltro {
        huerfanos_primero: true,
        ..Default::default()
    };
    let filas = remitos::listar(&pool, &ScopeCtx::de_delegacion(a), &filtro)
        .await
        .unwrap();
    assert_eq!(filas.len(), 2);
    assert!(filas[0].delegacion_id.is_none());
}

#[tokio::test]
async fn unused_filters_compose_with_visibility() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;
    let scope = ScopeCtx::de_delegacion(a);

    let guia_id = guias::crear(&pool, &scope, draft("40")).await.unwrap();
    let usado = remitos::crear(&pool, &scope, draft_remito("41")).await.unwrap();
    remitos::crear(&pool, &scope, draft_remito("42")).await.unwrap();
    remitos::crear(&pool, &ScopeCtx::de_delegacion(b), draft_remito("43"))
        .await
        .unwrap();

    remitos::vincular_a_guia(&pool, &scope, usado, guia_id).await.unwrap();

    let filtro = RemitoFiltro {
        no_usados: true,
        ..Default::default()
    };
    let filas = remitos::listar(&pool, &scope, &filtro).await.unwrap();
    assert_eq!(filas.len(), 1);
    assert_eq!(filas[0].numero, "42");
}

#[tokio::test]
async fn unified_listing_respects_scope() {
    let pool = pool_con_esquema().await;
    let (a, b) = sembrar_delegaciones(&pool).await;

    guias::crear(&pool, &ScopeCtx::de_delegacion(a), draft("50")).await.unwrap();
    remitos::crear(&pool, &ScopeCtx::de_delegacion(a), draft_remito("51"))
        .await
        .unwrap();
    guias::crear(&pool, &ScopeCtx::de_delegacion(b), draft("52")).await.unwrap();

    let docs = documentos::listar(&pool, &ScopeCtx::de_delegacion(a)).await.unwrap();
    assert_eq!(docs.len(), 2);
    let tipos: std::collections::BTreeSet<_> = docs.iter().map(|d| d.tipo.clone()).collect();
    assert!(tipos.contains("guia") && tipos.contains("remito"));

    let todos = documentos::listar(&pool, &ScopeCtx::total()).await.unwrap();
    assert_eq!(todos.len(), 3);
}

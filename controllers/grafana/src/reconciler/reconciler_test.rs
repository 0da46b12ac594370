//! Unit tests for the reconciler

#[cfg(test)]
mod tests {
    use super::super::{Convergence, Reconciler};
    use crate::builder::{build_datasource, build_grafana_instance};
    use crate::labels::{BaseParams, DatasourceKind};
    use crate::stage::Stage;
    use crate::test_utils::*;
    use crds::{Grafana, GrafanaDatasource};
    use kube::ResourceExt;

    fn setup() -> (MockObjectStore<Grafana>, MockObjectStore<GrafanaDatasource>, Reconciler) {
        let instances = MockObjectStore::new();
        let datasources = MockObjectStore::new();
        let reconciler = test_reconciler(&instances, &datasources);
        (instances, datasources, reconciler)
    }

    fn params(stage: Stage) -> BaseParams {
        BaseParams::new("acme", "shop", stage)
    }

    /// An instance carrying the selector labels of `params` but named `name`
    fn stray_instance(params: &BaseParams, name: &str) -> Grafana {
        let mut grafana = build_grafana_instance(&test_config(), params, "stale");
        grafana.metadata.name = Some(name.to_string());
        grafana
    }

    #[tokio::test]
    async fn test_ensure_instance_creates_then_patches() {
        let (instances, _, reconciler) = setup();
        let prod = params(Stage::Prod);

        let first = reconciler.ensure_grafana_instance(&prod, "expr").await.unwrap();
        let second = reconciler.ensure_grafana_instance(&prod, "expr").await.unwrap();

        assert_eq!(first, Convergence::Created);
        assert_eq!(second, Convergence::Patched);
        assert_eq!(instances.names(), vec!["acme-shop-prod"]);
        let calls = instances.calls();
        assert_eq!((calls.creates, calls.patches, calls.deletes), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_patch_restores_drifted_spec() {
        let (instances, _, reconciler) = setup();
        let prod = params(Stage::Prod);
        let mut drifted = build_grafana_instance(&test_config(), &prod, "old expression");
        drifted
            .labels_mut()
            .insert("team".to_string(), "observability".to_string());
        drifted.spec.route.as_mut().unwrap().spec.host = "elsewhere.example.com".to_string();
        instances.insert(drifted);

        reconciler.ensure_grafana_instance(&prod, "new expression").await.unwrap();

        let patched = instances.get("acme-shop-prod").unwrap();
        assert_eq!(patched.spec.config["auth.generic_oauth"]["role_attribute_path"], "new expression");
        assert_eq!(patched.spec.route.as_ref().unwrap().spec.host, "grafana.apps.example.com");
        // merge patch keeps labels it does not mention
        assert_eq!(patched.labels()["team"], "observability");
    }

    #[tokio::test]
    async fn test_misnamed_instance_is_replaced() {
        let (instances, _, reconciler) = setup();
        let prod = params(Stage::Prod);
        instances.insert(stray_instance(&prod, "shop-prod"));

        let outcome = reconciler.ensure_grafana_instance(&prod, "expr").await.unwrap();

        assert_eq!(outcome, Convergence::Recreated { deleted: 1 });
        assert_eq!(instances.names(), vec!["acme-shop-prod"]);
    }

    #[tokio::test]
    async fn test_duplicates_are_healed() {
        let (instances, _, reconciler) = setup();
        let prod = params(Stage::Prod);
        instances.insert(build_grafana_instance(&test_config(), &prod, "expr"));
        instances.insert(stray_instance(&prod, "acme-shop-prod-copy"));

        let outcome = reconciler.ensure_grafana_instance(&prod, "expr").await.unwrap();

        assert_eq!(outcome, Convergence::Recreated { deleted: 2 });
        assert_eq!(instances.names(), vec!["acme-shop-prod"]);
    }

    #[tokio::test]
    async fn test_failed_cleanup_aborts_creation() {
        let (instances, _, reconciler) = setup();
        let prod = params(Stage::Prod);
        instances.insert(stray_instance(&prod, "one"));
        instances.insert(stray_instance(&prod, "two"));
        instances.fail_on_object("delete", "one");

        let err = reconciler.ensure_grafana_instance(&prod, "expr").await.unwrap_err();

        assert!(err.to_string().contains("injected delete failure on one"));
        // every delete was attempted
        assert_eq!(instances.names(), vec!["one"]);
        assert_eq!(instances.calls().creates, 0);
    }

    #[tokio::test]
    async fn test_ensure_datasource_is_scoped_by_source() {
        let (_, datasources, reconciler) = setup();
        let prod = params(Stage::Prod);

        reconciler.ensure_datasource(&prod, DatasourceKind::Prometheus).await.unwrap();
        let outcome = reconciler.ensure_datasource(&prod, DatasourceKind::AlertManager).await.unwrap();

        assert_eq!(outcome, Convergence::Created);
        assert_eq!(
            datasources.names(),
            vec!["datasource-am-acme-shop-prod", "datasource-prom-acme-shop-prod"]
        );
    }

    #[tokio::test]
    async fn test_ensure_stage_is_idempotent() {
        let (instances, datasources, reconciler) = setup();
        let prod = params(Stage::Prod);

        reconciler.ensure_stage(&prod).await.unwrap();
        reconciler.ensure_stage(&prod).await.unwrap();

        assert_eq!(instances.len(), 1);
        assert_eq!(datasources.len(), 2);
        assert_eq!(instances.calls().creates, 1);
        assert_eq!(datasources.calls().creates, 2);
        assert_eq!(datasources.calls().patches, 2);

        let grafana = instances.get("acme-shop-prod").unwrap();
        assert!(grafana.spec.config["auth.generic_oauth"]["role_attribute_path"]
            .contains("'/acme-shop/grafana/prod-RW'"));
    }

    #[tokio::test]
    async fn test_delete_stage_leaves_other_stage() {
        let (instances, datasources, reconciler) = setup();
        reconciler.ensure_stage(&params(Stage::Prod)).await.unwrap();
        reconciler.ensure_stage(&params(Stage::HorsProd)).await.unwrap();

        reconciler.delete_stage(&params(Stage::Prod)).await.unwrap();

        assert_eq!(instances.names(), vec!["acme-shop-hprod"]);
        assert_eq!(
            datasources.names(),
            vec!["datasource-am-acme-shop-hprod", "datasource-prom-acme-shop-hprod"]
        );
    }

    #[tokio::test]
    async fn test_delete_with_nothing_to_delete_succeeds() {
        let (instances, datasources, reconciler) = setup();

        reconciler.delete_stage(&params(Stage::HorsProd)).await.unwrap();

        assert_eq!(instances.calls().deletes, 0);
        assert_eq!(datasources.calls().deletes, 0);
    }

    #[tokio::test]
    async fn test_delete_stage_attempts_everything() {
        let (instances, datasources, reconciler) = setup();
        let prod = params(Stage::Prod);
        reconciler.ensure_stage(&prod).await.unwrap();
        datasources.fail_on_object("delete", "datasource-prom-acme-shop-prod");

        let err = reconciler.delete_stage(&prod).await.unwrap_err();

        assert!(err.to_string().starts_with("1 operation(s) failed"));
        assert_eq!(instances.len(), 0);
        assert_eq!(datasources.names(), vec!["datasource-prom-acme-shop-prod"]);
    }

    #[tokio::test]
    async fn test_unrelated_datasources_are_ignored() {
        let (_, datasources, reconciler) = setup();
        let other = BaseParams::new("acme", "blog", Stage::Prod);
        let foreign = build_datasource(
            &test_config(),
            &other,
            DatasourceKind::Prometheus,
            &other.datasource_name(DatasourceKind::Prometheus),
        );
        datasources.insert(foreign);

        reconciler.ensure_stage(&params(Stage::Prod)).await.unwrap();
        reconciler.delete_stage(&params(Stage::Prod)).await.unwrap();

        assert_eq!(datasources.names(), vec!["datasource-prom-acme-blog-prod"]);
    }
}

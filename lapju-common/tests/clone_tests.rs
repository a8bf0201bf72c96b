//! Tests for materializing the template catalog into project task trees

use lapju_common::db::init::init_database;
use lapju_common::db::models::NodeFields;
use lapju_common::db::projects::create_project;
use lapju_common::db::tasks::{
    clone_templates_for_project, count_tasks, delete_project_tasks, insert_task, list_tasks,
    update_task,
};
use lapju_common::db::templates::{insert_template, list_templates};
use lapju_common::tree;
use lapju_common::{fixed, Error};
use std::collections::HashMap;
use tempfile::TempDir;

async fn temp_db() -> (TempDir, sqlx::SqlitePool) {
    let dir = TempDir::new().expect("create temp dir");
    let pool = init_database(&dir.path().join("lapju.db"))
        .await
        .expect("initialize database");
    (dir, pool)
}

/// Catalog used by most tests:
/// Persiapan { Pembersihan, Pengukuran }, Pondasi { Galian }
async fn seed_catalog(pool: &sqlx::SqlitePool) {
    let prep = insert_template(
        pool,
        None,
        NodeFields {
            name: "Persiapan".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    insert_template(
        pool,
        Some(&prep.guid),
        NodeFields {
            name: "Pembersihan".to_string(),
            volume_h: 12_000, // 120.00
            unit: Some("m2".to_string()),
            price_h: 1_500, // 15.00
            weight_h: 2_500,
        },
    )
    .await
    .unwrap();

    insert_template(
        pool,
        Some(&prep.guid),
        NodeFields {
            name: "Pengukuran".to_string(),
            volume_h: 100,
            unit: Some("ls".to_string()),
            price_h: 50_000,
            weight_h: 2_500,
        },
    )
    .await
    .unwrap();

    let pondasi = insert_template(
        pool,
        None,
        NodeFields {
            name: "Pondasi".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    insert_template(
        pool,
        Some(&pondasi.guid),
        NodeFields {
            name: "Galian".to_string(),
            volume_h: 4_550, // 45.50
            unit: Some("m3".to_string()),
            price_h: 7_525, // 75.25
            weight_h: 5_000,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_clone_fidelity() {
    let (_dir, pool) = temp_db().await;
    seed_catalog(&pool).await;

    let project = create_project(&pool, "Gedung A", None, None).await.unwrap();
    let cloned = clone_templates_for_project(&pool, &project.guid)
        .await
        .unwrap();

    let catalog = list_templates(&pool).await.unwrap();
    let tasks = list_tasks(&pool, &project.guid).await.unwrap();

    // Same node count, every clone linked back to its template
    assert_eq!(cloned, catalog.len());
    assert_eq!(tasks.len(), catalog.len());

    let task_by_template: HashMap<&str, _> = tasks
        .iter()
        .map(|t| (t.template_guid.as_deref().unwrap(), t))
        .collect();

    for template in &catalog {
        let task = task_by_template[template.guid.as_str()];
        assert_eq!(task.name, template.name);
        assert_eq!(task.volume_h, template.volume_h);
        assert_eq!(task.unit, template.unit);
        assert_eq!(task.price_h, template.price_h);
        assert_eq!(task.weight_h, template.weight_h);
        // Bounds are reused verbatim - trees are numbered independently
        assert_eq!(task.left_bound, template.left_bound);
        assert_eq!(task.right_bound, template.right_bound);

        // Structural isomorphism through the parent links
        match &template.parent_guid {
            Some(parent_template) => {
                let parent_task = task_by_template[parent_template.as_str()];
                assert_eq!(task.parent_guid.as_deref(), Some(parent_task.guid.as_str()));
            }
            None => assert!(task.parent_guid.is_none()),
        }
    }

    assert!(tree::verify_bounds(&tasks).is_empty());
}

#[tokio::test]
async fn test_clone_computes_total_price() {
    let (_dir, pool) = temp_db().await;
    seed_catalog(&pool).await;

    let project = create_project(&pool, "Gedung A", None, None).await.unwrap();
    clone_templates_for_project(&pool, &project.guid)
        .await
        .unwrap();

    let tasks = list_tasks(&pool, &project.guid).await.unwrap();
    for task in &tasks {
        assert_eq!(
            task.total_price_h,
            fixed::mul(task.price_h, task.volume_h),
            "total price mismatch for {}",
            task.name
        );
    }

    // 45.50 m3 × 75.25 = 3423.88 (rounded from 3423.875)
    let galian = tasks.iter().find(|t| t.name == "Galian").unwrap();
    assert_eq!(galian.total_price_h, 342_388);
}

#[tokio::test]
async fn test_clone_empty_catalog_is_noop() {
    let (_dir, pool) = temp_db().await;

    let project = create_project(&pool, "Gedung A", None, None).await.unwrap();
    let cloned = clone_templates_for_project(&pool, &project.guid)
        .await
        .unwrap();
    assert_eq!(cloned, 0);
    assert_eq!(count_tasks(&pool, &project.guid).await.unwrap(), 0);
}

#[tokio::test]
async fn test_clone_missing_project() {
    let (_dir, pool) = temp_db().await;
    let result = clone_templates_for_project(&pool, "no-such-project").await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_clone_twice_duplicates() {
    // Cloning is only idempotent on an empty tree; a second run duplicates.
    // Callers guard with count_tasks or a reset.
    let (_dir, pool) = temp_db().await;
    seed_catalog(&pool).await;

    let project = create_project(&pool, "Gedung A", None, None).await.unwrap();
    clone_templates_for_project(&pool, &project.guid)
        .await
        .unwrap();
    clone_templates_for_project(&pool, &project.guid)
        .await
        .unwrap();

    let catalog_len = list_templates(&pool).await.unwrap().len();
    assert_eq!(
        count_tasks(&pool, &project.guid).await.unwrap() as usize,
        catalog_len * 2
    );
}

#[tokio::test]
async fn test_clones_are_isolated_per_project() {
    let (_dir, pool) = temp_db().await;
    seed_catalog(&pool).await;

    let first = create_project(&pool, "Gedung A", None, None).await.unwrap();
    let second = create_project(&pool, "Gedung B", None, None).await.unwrap();
    clone_templates_for_project(&pool, &first.guid).await.unwrap();
    clone_templates_for_project(&pool, &second.guid)
        .await
        .unwrap();

    let first_tasks = list_tasks(&pool, &first.guid).await.unwrap();
    let second_tasks = list_tasks(&pool, &second.guid).await.unwrap();
    assert_eq!(first_tasks.len(), second_tasks.len());

    // Resetting one project leaves the other untouched
    let deleted = delete_project_tasks(&pool, &first.guid).await.unwrap();
    assert_eq!(deleted as usize, first_tasks.len());
    assert_eq!(count_tasks(&pool, &first.guid).await.unwrap(), 0);
    assert_eq!(
        count_tasks(&pool, &second.guid).await.unwrap() as usize,
        second_tasks.len()
    );
}

#[tokio::test]
async fn test_manual_task_keeps_total_price_invariant() {
    let (_dir, pool) = temp_db().await;

    let project = create_project(&pool, "Gedung A", None, None).await.unwrap();
    let task = insert_task(
        &pool,
        &project.guid,
        None,
        NodeFields {
            name: "Manual".to_string(),
            volume_h: 300,  // 3.00
            price_h: 1_050, // 10.50
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(task.template_guid.is_none());
    assert_eq!(task.total_price_h, 3_150); // 31.50

    // total price is recomputed on update, before persistence
    let updated = update_task(
        &pool,
        &task.guid,
        NodeFields {
            name: "Manual".to_string(),
            volume_h: 400,
            price_h: 1_050,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.total_price_h, 4_200);
}

#[tokio::test]
async fn test_leaf_numbers_follow_tree_order() {
    let (_dir, pool) = temp_db().await;
    seed_catalog(&pool).await;

    let project = create_project(&pool, "Gedung A", None, None).await.unwrap();
    clone_templates_for_project(&pool, &project.guid)
        .await
        .unwrap();

    let tasks = list_tasks(&pool, &project.guid).await.unwrap();
    let numbers = tree::leaf_numbers(&tasks);

    let number_of = |name: &str| {
        let task = tasks.iter().find(|t| t.name == name).unwrap();
        numbers.get(&task.guid).copied()
    };

    // Numbering restarts per parent, in left-bound order
    assert_eq!(number_of("Pembersihan"), Some(1));
    assert_eq!(number_of("Pengukuran"), Some(2));
    assert_eq!(number_of("Galian"), Some(1));
    // Containers receive no number
    assert_eq!(number_of("Persiapan"), None);
    assert_eq!(number_of("Pondasi"), None);
}

//! Integration-Tests fuer beide Store-Backends

use std::sync::Arc;

use chrono::{Duration, Utc};
use tavern_core::types::{ChannelId, TavernId};
use tavern_db::{
    ChannelRecord, MemoryStore, SqliteStore, TavernPatch, TavernRecord, TavernStore,
};

fn tavern(id: &str, name: &str) -> TavernRecord {
    TavernRecord {
        id: TavernId::from(id),
        name: name.to_string(),
        icon: String::new(),
        creator_public_key: "abc123".into(),
        signaling_url: String::new(),
        created_at: Utc::now(),
    }
}

fn channel(id: &str, tavern_id: &str, name: &str) -> ChannelRecord {
    ChannelRecord {
        id: ChannelId::from(id),
        tavern_id: TavernId::from(tavern_id),
        name: name.to_string(),
        created_at: Utc::now(),
    }
}

async fn backends() -> Vec<Arc<dyn TavernStore>> {
    let sqlite = SqliteStore::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden");
    vec![Arc::new(MemoryStore::neu()), Arc::new(sqlite)]
}

#[tokio::test]
async fn tavern_erstellen_und_laden() {
    for store in backends().await {
        store.create_tavern(&tavern("t1", "My Tavern")).await.unwrap();

        let geladen = store.get_tavern(&TavernId::from("t1")).await.unwrap().unwrap();
        assert_eq!(geladen.name, "My Tavern", "backend {}", store.backend_name());
        assert_eq!(geladen.creator_public_key, "abc123");

        assert!(store
            .get_tavern(&TavernId::from("nonexistent"))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn taverns_nach_erstellung_sortiert() {
    for store in backends().await {
        assert!(store.list_taverns().await.unwrap().is_empty());

        let mut spaeter = tavern("t2", "Tavern B");
        spaeter.created_at = Utc::now() + Duration::seconds(5);
        store.create_tavern(&spaeter).await.unwrap();
        store.create_tavern(&tavern("t1", "Tavern A")).await.unwrap();

        let namen: Vec<String> = store
            .list_taverns()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(namen, vec!["Tavern A", "Tavern B"], "backend {}", store.backend_name());
    }
}

#[tokio::test]
async fn tavern_patch() {
    for store in backends().await {
        store.create_tavern(&tavern("t1", "Old Name")).await.unwrap();
        store
            .update_tavern(
                &TavernId::from("t1"),
                TavernPatch {
                    name: Some("New Name".into()),
                    icon: Some("🍺".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let geladen = store.get_tavern(&TavernId::from("t1")).await.unwrap().unwrap();
        assert_eq!(geladen.name, "New Name");
        assert_eq!(geladen.icon, "🍺");
        assert_eq!(geladen.creator_public_key, "abc123");

        // Leerer Patch und unbekannte Tavern sind No-ops
        store
            .update_tavern(&TavernId::from("t1"), TavernPatch::default())
            .await
            .unwrap();
        store
            .update_tavern(
                &TavernId::from("nonexistent"),
                TavernPatch {
                    name: Some("Nope".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(store
            .get_tavern(&TavernId::from("nonexistent"))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn channels_erstellen_und_loeschen() {
    for store in backends().await {
        store.create_tavern(&tavern("t1", "T")).await.unwrap();
        let t1 = TavernId::from("t1");
        store.create_channel(&t1, &channel("c1", "t1", "General")).await.unwrap();
        let mut zweiter = channel("c2", "t1", "Voice");
        zweiter.created_at = Utc::now() + Duration::seconds(1);
        store.create_channel(&t1, &zweiter).await.unwrap();

        let namen: Vec<String> = store
            .get_channels(&t1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(namen, vec!["General", "Voice"]);

        store.delete_channel(&t1, &ChannelId::from("c1")).await.unwrap();
        store.delete_channel(&t1, &ChannelId::from("nonexistent")).await.unwrap();

        let uebrig = store.get_channels(&t1).await.unwrap();
        assert_eq!(uebrig.len(), 1);
        assert_eq!(uebrig[0].name, "Voice");

        assert!(store
            .get_channels(&TavernId::from("leer"))
            .await
            .unwrap()
            .is_empty());
    }
}

#[tokio::test]
async fn tavern_loeschen_kaskadiert_channels() {
    for store in backends().await {
        let t1 = TavernId::from("t1");
        store
            .create_tavern_with_channel(&tavern("t1", "T"), &channel("c1", "t1", "General"))
            .await
            .unwrap();
        store.create_channel(&t1, &channel("c2", "t1", "Voice")).await.unwrap();
        assert_eq!(store.get_channels(&t1).await.unwrap().len(), 2);

        store.delete_tavern(&t1).await.unwrap();

        assert!(store.get_tavern(&t1).await.unwrap().is_none());
        assert!(
            store.get_channels(&t1).await.unwrap().is_empty(),
            "backend {}",
            store.backend_name()
        );
    }
}

#[tokio::test]
async fn channel_ohne_tavern_abgelehnt() {
    for store in backends().await {
        let ergebnis = store
            .create_channel(&TavernId::from("fehlt"), &channel("c1", "fehlt", "General"))
            .await;
        assert!(ergebnis.is_err(), "backend {}", store.backend_name());
    }
}

#[tokio::test]
async fn tavern_mit_channel_ist_eine_einheit() {
    for store in backends().await {
        store
            .create_tavern_with_channel(&tavern("t1", "T"), &channel("c1", "t1", "General"))
            .await
            .unwrap();

        // Zweiter Versuch mit gleicher Channel-ID aber neuer Tavern schlaegt
        // bei SQLite am Channel fehl; die Tavern darf dann nicht uebrig bleiben.
        let ergebnis = store
            .create_tavern_with_channel(&tavern("t2", "T2"), &channel("c1", "t2", "General"))
            .await;
        if ergebnis.is_err() {
            assert!(store.get_tavern(&TavernId::from("t2")).await.unwrap().is_none());
        }
    }
}

#[tokio::test]
async fn sqlite_ueberlebt_neustart() {
    let verzeichnis = tempfile::tempdir().unwrap();
    let pfad = verzeichnis.path().join("unterordner").join("tavern.db");

    {
        let store = SqliteStore::oeffnen(&pfad).await.unwrap();
        store
            .create_tavern_with_channel(
                &tavern("t1", "Persistent Tavern"),
                &channel("c1", "t1", "General"),
            )
            .await
            .unwrap();
        store.close().await.unwrap();
    }

    assert!(pfad.exists());

    let store = SqliteStore::oeffnen(&pfad).await.unwrap();
    let taverns = store.list_taverns().await.unwrap();
    assert_eq!(taverns.len(), 1);
    assert_eq!(taverns[0].name, "Persistent Tavern");

    let channels = store.get_channels(&TavernId::from("t1")).await.unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].name, "General");
    store.close().await.unwrap();
}

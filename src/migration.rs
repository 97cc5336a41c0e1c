/*!
 * Attachment migration
 *
 * Copies every attachment of a home, usually a proxy for a home owned by
 * another pod, into a home on this pod:
 *
 * 1. Enumerate the source attachments and record each under a new local id
 * 2. Stream each attachment's bytes into local storage and verify what arrived
 * 3. Recreate the attachment links against the new ids
 * 4. Promote the transitional data to live data
 *
 * Any failure discards the records, links and bytes imported by that run.
 */

use podstore_interface::{AttachmentLink, AttachmentStorage, CalendarHome, ResourceId};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{PodstoreError, Result};
use crate::system::{checksum, LocalCalendarHome};

/// What a migration copied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub attachments: usize,
    /// Bytes that arrived in destination storage
    pub bytes: u64,
    pub links: usize,
    /// Source attachment id -> destination attachment id
    pub id_map: BTreeMap<ResourceId, ResourceId>,
}

/// Copy the attachments and attachment links of `source` into `dest`.
///
/// Either everything arrives or nothing is left behind in `dest`: on failure
/// the records, links and bytes imported so far are discarded, so the
/// migration can simply be run again. The bytes streamed by `source` must land
/// in `dest`'s storage, meaning a foreign `source` has to be loaded through a
/// transaction of the pod holding `dest`.
///
/// Calendar object ids carried by the links are kept as the source reported
/// them.
pub async fn migrate_attachments(
    source: &dyn CalendarHome,
    dest: &LocalCalendarHome,
) -> Result<MigrationReport> {
    let start = Instant::now();
    let owner = source.owner_uid().to_string();
    info!(
        "Migrating attachments of {} (external: {}) into home {}",
        owner,
        source.is_external(),
        dest.resource_id()
    );

    let mut imported = Vec::new();
    match copy_attachments(source, dest, &owner, &mut imported).await {
        Ok(report) => {
            info!(
                "Migrated {} attachments ({} bytes, {} links) for {} in {:?}",
                report.attachments,
                report.bytes,
                report.links,
                owner,
                start.elapsed()
            );
            Ok(report)
        }
        Err(err) => {
            warn!(
                "Migration of {} failed after importing {} attachments: {}",
                owner,
                imported.len(),
                err
            );
            if let Err(cleanup) = dest.discard_imported(&imported).await {
                warn!("Could not discard partial migration of {}: {}", owner, cleanup);
            }
            Err(err)
        }
    }
}

async fn copy_attachments(
    source: &dyn CalendarHome,
    dest: &LocalCalendarHome,
    owner: &str,
    imported: &mut Vec<ResourceId>,
) -> Result<MigrationReport> {
    let failed = |reason: String| PodstoreError::Migration {
        owner: owner.to_string(),
        reason,
    };
    let storage = dest.storage();
    let mut report = MigrationReport::default();

    for remote in source.get_all_attachments().await? {
        let local = dest.import_attachment(&remote).await?;
        imported.push(local.id);
        source.read_attachment_data(remote.id, &local).await?;

        let data = storage.read(local.id).await.map_err(|_| {
            failed(format!(
                "no data for attachment {} reached home {}",
                remote.id,
                dest.resource_id()
            ))
        })?;
        if data.len() as u64 != remote.size {
            return Err(failed(format!(
                "attachment {} arrived with {} bytes, expected {}",
                remote.id,
                data.len(),
                remote.size
            )));
        }
        if !remote.checksum.is_empty() && checksum(&data) != remote.checksum {
            return Err(failed(format!(
                "attachment {} failed checksum verification",
                remote.id
            )));
        }
        debug!(
            "Copied attachment {} ({} bytes) as {}",
            remote.id,
            data.len(),
            local.id
        );

        report.attachments += 1;
        report.bytes += data.len() as u64;
        report.id_map.insert(remote.id, local.id);
    }

    for link in source.get_attachment_links().await? {
        let attachment_id = *report.id_map.get(&link.attachment_id).ok_or_else(|| {
            failed(format!(
                "link for {} references unknown attachment {}",
                link.managed_id, link.attachment_id
            ))
        })?;
        dest.import_attachment_link(AttachmentLink {
            attachment_id,
            ..link
        })
        .await?;
        report.links += 1;
    }

    let promoted = storage.commit_migrated(imported.as_slice())?;
    debug!("Promoted {} migrated attachments for {}", promoted, owner);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PodConfig;
    use crate::directory::PodDirectory;
    use crate::loopback::LoopbackConduit;
    use crate::store::Store;
    use podstore_interface::{AttachmentStorage, Calendar, CalendarObject, StoreError, WriteMode};
    use std::sync::Arc;

    const EVENT: &str =
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:m1\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

    struct Federation {
        a: Store,
        b: Store,
        c: Store,
    }

    async fn federation() -> Federation {
        let directory = PodDirectory::new();
        let conduit = Arc::new(LoopbackConduit::new(directory.clone()));
        let pod = |id: &str| {
            Store::new(&PodConfig::for_pod(id), directory.clone(), conduit.clone()).unwrap()
        };
        let (a, b, c) = (pod("pod-a"), pod("pod-b"), pod("pod-c"));
        for store in [&a, &b, &c] {
            conduit.attach_pod(store.local()).await;
        }
        Federation { a, b, c }
    }

    async fn home_with_attachments(
        pods: &Federation,
        owner: &str,
        files: &[(&str, &'static [u8])],
    ) {
        let origin = pods.a.begin().create_home(owner).await.unwrap();
        let calendar = origin.local_calendar("calendar").await.unwrap();
        let object = calendar.create_object("m1.ics", EVENT).await.unwrap();
        for (name, data) in files {
            object
                .add_attachment(&[], "text/plain", name, Box::new(*data))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_migrates_foreign_attachments() {
        let pods = federation().await;
        let origin = pods.a.begin().create_home("user01").await.unwrap();
        let calendar = origin.local_calendar("calendar").await.unwrap();
        let object = calendar.create_object("m1.ics", EVENT).await.unwrap();
        object
            .add_attachment(&[], "text/plain", "notes.txt", Box::new(&b"meeting notes"[..]))
            .await
            .unwrap();

        let source = pods.b.begin().calendar_home_with_uid("user01").await.unwrap();
        assert!(source.is_external());
        let dest = pods.b.local().create_home("user01").await.unwrap();

        let report = migrate_attachments(source.as_ref(), &dest).await.unwrap();
        assert_eq!(report.attachments, 1);
        assert_eq!(report.bytes, 13);
        assert_eq!(report.links, 1);

        let (remote_id, local_id) = report.id_map.iter().next().map(|(r, l)| (*r, *l)).unwrap();
        assert_ne!(remote_id, local_id);
        let storage = dest.storage();
        assert_eq!(storage.read(local_id).await.unwrap(), b"meeting notes");
        assert_eq!(storage.mode_of(local_id).unwrap(), Some(WriteMode::Live));

        let links = dest.get_attachment_links().await.unwrap();
        assert_eq!(links[0].attachment_id, local_id);
        assert_eq!(links[0].calendar_object_id, object.resource_id());
    }

    #[tokio::test]
    async fn test_empty_home_migrates_nothing() {
        let pods = federation().await;
        pods.a.begin().create_home("user02").await.unwrap();

        let source = pods.b.begin().calendar_home_with_uid("user02").await.unwrap();
        let dest = pods.b.local().create_home("user02").await.unwrap();

        let report = migrate_attachments(source.as_ref(), &dest).await.unwrap();
        assert_eq!(report, MigrationReport::default());
    }

    #[tokio::test]
    async fn test_repeated_migration_is_refused() {
        let pods = federation().await;
        let origin = pods.a.begin().create_home("user03").await.unwrap();
        let calendar = origin.local_calendar("calendar").await.unwrap();
        let object = calendar.create_object("m1.ics", EVENT).await.unwrap();
        object
            .add_attachment(&[], "text/plain", "a.txt", Box::new(&b"a"[..]))
            .await
            .unwrap();

        let source = pods.b.begin().calendar_home_with_uid("user03").await.unwrap();
        let dest = pods.b.local().create_home("user03").await.unwrap();
        migrate_attachments(source.as_ref(), &dest).await.unwrap();

        let err = migrate_attachments(source.as_ref(), &dest).await.err().unwrap();
        assert!(matches!(
            err,
            PodstoreError::Store(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_migration_leaves_nothing_and_can_be_retried() {
        let pods = federation().await;
        let files: [(&str, &'static [u8]); 2] = [("a.txt", b"first"), ("b.txt", b"second")];
        home_with_attachments(&pods, "user04", &files).await;

        let origin = pods.a.local().home_with_uid("user04").await.unwrap();
        let missing = origin
            .get_all_attachments()
            .await
            .unwrap()
            .into_iter()
            .find(|attachment| attachment.name == "b.txt")
            .unwrap();
        let source_storage = pods.a.local().storage();
        source_storage.remove(missing.id).unwrap();

        let source = pods.b.begin().calendar_home_with_uid("user04").await.unwrap();
        let dest = pods.b.local().create_home("user04").await.unwrap();
        let err = migrate_attachments(source.as_ref(), &dest).await.err().unwrap();
        assert!(matches!(err, PodstoreError::Store(StoreError::Conduit(_))));
        assert!(dest.get_all_attachments().await.unwrap().is_empty());
        assert!(dest.get_attachment_links().await.unwrap().is_empty());
        assert!(dest.storage().is_empty());

        source_storage
            .put(missing.id, b"second".to_vec(), WriteMode::Live)
            .unwrap();
        let report = migrate_attachments(source.as_ref(), &dest).await.unwrap();
        assert_eq!(report.attachments, 2);
        assert_eq!(report.bytes, 11);
        assert_eq!(report.links, 2);
        assert_eq!(dest.get_all_attachments().await.unwrap().len(), 2);
        for local_id in report.id_map.values() {
            assert_eq!(dest.storage().mode_of(*local_id).unwrap(), Some(WriteMode::Live));
        }
    }

    #[tokio::test]
    async fn test_bytes_landing_outside_destination_fail_migration() {
        let pods = federation().await;
        home_with_attachments(&pods, "user05", &[("a.txt", &b"payload"[..])]).await;

        // Proxy loaded on pod-c streams into pod-c's storage
        let source = pods.c.begin().calendar_home_with_uid("user05").await.unwrap();
        let dest = pods.b.local().create_home("user05").await.unwrap();

        let err = migrate_attachments(source.as_ref(), &dest).await.err().unwrap();
        match err {
            PodstoreError::Migration { owner, reason } => {
                assert_eq!(owner, "user05");
                assert!(reason.contains("no data"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(dest.get_all_attachments().await.unwrap().is_empty());
        assert!(dest.storage().is_empty());
    }

    #[tokio::test]
    async fn test_discarding_keeps_earlier_migration() {
        let pods = federation().await;
        home_with_attachments(&pods, "user06", &[("a.txt", &b"kept"[..])]).await;

        let source = pods.b.begin().calendar_home_with_uid("user06").await.unwrap();
        let dest = pods.b.local().create_home("user06").await.unwrap();
        let first = migrate_attachments(source.as_ref(), &dest).await.unwrap();

        assert!(migrate_attachments(source.as_ref(), &dest).await.is_err());
        let local_id = *first.id_map.values().next().unwrap();
        assert_eq!(dest.storage().read(local_id).await.unwrap(), b"kept");
        assert_eq!(dest.get_attachment_links().await.unwrap().len(), 1);
    }
}

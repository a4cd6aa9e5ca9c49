mod common;

use std::collections::HashSet;

use common::{gzip, Harness};
use domain_provisioning::{
    command::OpenUploadCommand,
    model::vo::Fragment,
    service::{ContentVerifierService, ProvisioningService, UploadSessionService},
};
use proptest::prelude::*;
use service_provisioning::ContentVerifierServiceImpl;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counter_matches_distinct_indices(
        chunk_count in 1u64..16,
        writes in prop::collection::vec(0u64..20, 0..40),
    ) {
        runtime().block_on(async {
            let harness = Harness::new();
            let session_id = harness
                .sessions
                .open(OpenUploadCommand::new(64, chunk_count, "alice"))
                .await
                .unwrap();
            let mut seen = HashSet::new();
            for index in writes {
                let written = harness
                    .sessions
                    .upload_fragment(Fragment {
                        session_id: session_id.to_owned(),
                        index,
                        content: vec![index as u8],
                    })
                    .await;
                if index < chunk_count {
                    seen.insert(index);
                    let receipt = written.unwrap();
                    prop_assert_eq!(receipt.uploaded_count, seen.len() as u64);
                } else {
                    prop_assert!(written.is_err());
                }
                let session = harness.sessions.status(&session_id).await.unwrap().unwrap();
                prop_assert!(session.uploaded_chunks <= chunk_count);
                prop_assert_eq!(session.uploaded_chunks, seen.len() as u64);
            }
            Ok(())
        })?;
    }

    #[test]
    fn upload_order_does_not_matter(
        module in prop::collection::vec(any::<u8>(), 1..2048),
        chunk_count in 1u64..6,
        order in any::<u64>(),
    ) {
        runtime().block_on(async {
            let harness = Harness::new();
            let payload = gzip(&module);
            let (session_id, fragments) = harness.open(&payload, chunk_count).await;
            let mut indices: Vec<u64> = (0..chunk_count).collect();
            indices.rotate_left((order % chunk_count) as usize);
            indices.reverse();
            for index in indices {
                harness.upload(&session_id, index, &fragments[index as usize]).await;
            }
            let receipt = harness.provisioning.finalize(&session_id).await.unwrap();
            prop_assert_eq!(&harness.host.installed.lock().unwrap()["unit-1"], &module);
            prop_assert_eq!(receipt.record.original_size, module.len() as u64);
            Ok(())
        })?;
    }

    #[test]
    fn verification_round_trips_and_hashes_deterministically(
        module in prop::collection::vec(any::<u8>(), 0..4096),
        cut in any::<prop::sample::Index>(),
    ) {
        let verifier = ContentVerifierServiceImpl::builder().build();
        let payload = gzip(&module);
        let (a, b) = payload.split_at(cut.index(payload.len()));
        let split = verifier
            .reassemble_and_verify(vec![a.to_vec(), b.to_vec()], payload.len() as u64, None)
            .unwrap();
        let whole = verifier
            .reassemble_and_verify(vec![payload.clone()], payload.len() as u64, None)
            .unwrap();
        prop_assert_eq!(&split.bytes, &module);
        prop_assert_eq!(split.content_hash, whole.content_hash);
    }
}

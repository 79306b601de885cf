// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use repairdesk_domain::{TicketStatus, sha256_hex};

use super::helpers::{
    NOW, TestEnv, assigned_ticket, book, create_admin, create_agent, create_test_cause,
    create_viewer, setup, upload, upload_request, user_with_roles,
};
use crate::{
    ApiError, ReceiptStore, UploadImageRequest, download_ticket_image, list_ticket_images,
    upload_ticket_image,
};

fn try_upload(
    env: &mut TestEnv,
    user: &crate::AuthenticatedUser,
    ticket_id: i64,
    request: &UploadImageRequest,
) -> Result<crate::TicketWriteResponse, ApiError> {
    let config = env.config.clone();
    upload_ticket_image(
        &mut env.persistence,
        &config,
        ticket_id,
        request,
        user,
        create_test_cause(),
        NOW,
    )
}

fn stored_file_count(env: &TestEnv, ticket_id: i64) -> usize {
    let directory = env
        .config
        .upload_dir
        .join("tickets")
        .join(ticket_id.to_string());
    std::fs::read_dir(directory).map_or(0, Iterator::count)
}

#[test]
fn test_upload_stores_file_and_metadata() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent = create_agent(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);

    let write = upload(&mut env, &agent, ticket_id, "receipt", b"jpeg bytes");
    let image = write.image.unwrap();

    assert_eq!(image.ticket_id, ticket_id);
    assert_eq!(image.image_type, "RECEIPT");
    assert_eq!(image.file_name, "receipt.jpg");
    assert_eq!(image.size_bytes, 10);
    assert_eq!(image.checksum_sha256, sha256_hex(b"jpeg bytes"));
    assert_eq!(image.uploaded_by_user_id, Some(agent.user_id));
    assert!(image.image_id > 0);

    let store = ReceiptStore::new(env.config.upload_dir.clone());
    let on_disk = std::fs::read(store.resolve(&image.file_path).unwrap()).unwrap();
    assert_eq!(on_disk, b"jpeg bytes");
}

#[test]
fn test_second_upload_keeps_ticket_in_progress() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);

    let first = upload(&mut env, &admin, ticket_id, "BEFORE", b"one");
    let second = upload(&mut env, &admin, ticket_id, "AFTER", b"two");

    assert_eq!(first.ticket.status, "IN_PROGRESS");
    assert_eq!(second.ticket.status, "IN_PROGRESS");
    assert_eq!(second.ticket.version, first.ticket.version);

    let images = list_ticket_images(&mut env.persistence, ticket_id, &admin).unwrap();
    assert_eq!(images.images.len(), 2);
}

#[test]
fn test_upload_on_booked_ticket_writes_nothing() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let ticket_id = book(&mut env, "Ada", None);

    let err = try_upload(&mut env, &admin, ticket_id, &upload_request("RECEIPT", b"x")).unwrap_err();

    assert!(matches!(
        err,
        ApiError::InvalidTransition {
            from: TicketStatus::Booked,
            to: TicketStatus::InProgress,
            ..
        }
    ));
    assert_eq!(stored_file_count(&env, ticket_id), 0);
}

#[test]
fn test_duplicate_image_is_a_conflict() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    upload(&mut env, &admin, ticket_id, "RECEIPT", b"same bytes");

    let err = try_upload(
        &mut env,
        &admin,
        ticket_id,
        &upload_request("AFTER", b"same bytes"),
    )
    .unwrap_err();

    assert!(matches!(err, ApiError::Conflict { .. }));
    assert_eq!(stored_file_count(&env, ticket_id), 1);
}

#[test]
fn test_rejects_disallowed_extension() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    let request = UploadImageRequest {
        file_name: String::from("invoice.pdf"),
        mime_type: String::from("application/pdf"),
        ..upload_request("RECEIPT", b"%PDF")
    };

    let err = try_upload(&mut env, &admin, ticket_id, &request).unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "file"));
}

#[test]
fn test_rejects_oversized_file() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    env.config = env.config.clone().with_max_upload_mb(1);

    let big = vec![0_u8; 1024 * 1024 + 1];
    let err = try_upload(&mut env, &admin, ticket_id, &upload_request("RECEIPT", &big)).unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { .. }));
    assert_eq!(stored_file_count(&env, ticket_id), 0);
}

#[test]
fn test_rejects_unknown_image_type() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);

    let err = try_upload(&mut env, &admin, ticket_id, &upload_request("SELFIE", b"x")).unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput { ref field, .. } if field == "image_type"));
}

#[test]
fn test_path_in_file_name_is_dropped() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    let request = UploadImageRequest {
        file_name: String::from("../../etc/receipt.png"),
        mime_type: String::from("image/png"),
        ..upload_request("RECEIPT", b"png")
    };

    let write = try_upload(&mut env, &admin, ticket_id, &request).unwrap();

    let image = write.image.unwrap();
    assert_eq!(image.file_name, "receipt.png");
    assert!(image.file_path.starts_with(&format!("tickets/{ticket_id}/")));
}

#[test]
fn test_viewer_cannot_upload() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let viewer = create_viewer(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);

    let err = try_upload(&mut env, &viewer, ticket_id, &upload_request("RECEIPT", b"x")).unwrap_err();

    assert_eq!(
        err,
        ApiError::PermissionDenied {
            missing: vec![String::from("tickets.upload")]
        }
    );
}

#[test]
fn test_download_returns_stored_bytes() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let agent = create_agent(&mut env);
    let viewer = create_viewer(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    let image_id = upload(&mut env, &agent, ticket_id, "RECEIPT", b"jpeg bytes")
        .image
        .unwrap()
        .image_id;

    let config = env.config.clone();
    let download = download_ticket_image(&mut env.persistence, &config, image_id, &viewer).unwrap();

    assert_eq!(download.contents, b"jpeg bytes");
    assert_eq!(download.image.ticket_id, ticket_id);
    assert_eq!(download.image.mime_type, "image/jpeg");
    assert_eq!(download.image.file_name, "receipt.jpg");
}

#[test]
fn test_download_missing_image_or_file_is_not_found() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    let image = upload(&mut env, &admin, ticket_id, "RECEIPT", b"jpeg bytes")
        .image
        .unwrap();
    let config = env.config.clone();

    let missing_row =
        download_ticket_image(&mut env.persistence, &config, image.image_id + 100, &admin)
            .unwrap_err();
    assert!(
        matches!(missing_row, ApiError::ResourceNotFound { ref resource_type, .. } if resource_type == "Ticket image")
    );

    ReceiptStore::new(config.upload_dir.clone())
        .remove(&image.file_path)
        .unwrap();
    let missing_file =
        download_ticket_image(&mut env.persistence, &config, image.image_id, &admin).unwrap_err();
    assert!(matches!(missing_file, ApiError::ResourceNotFound { .. }));
}

#[test]
fn test_download_requires_ticket_read() {
    let mut env = setup();
    let admin = create_admin(&mut env);
    let nobody = user_with_roles(&mut env, "nobody@example.com", &[]);
    let (ticket_id, _, _) = assigned_ticket(&mut env, &admin);
    let image_id = upload(&mut env, &admin, ticket_id, "RECEIPT", b"jpeg bytes")
        .image
        .unwrap()
        .image_id;

    let config = env.config.clone();
    let err = download_ticket_image(&mut env.persistence, &config, image_id, &nobody).unwrap_err();

    assert_eq!(
        err,
        ApiError::PermissionDenied {
            missing: vec![String::from("tickets.read")]
        }
    );
}

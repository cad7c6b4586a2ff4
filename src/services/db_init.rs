use mongodb::{Database, IndexModel, bson::doc};

use crate::error::StoreError;

pub async fn ensure_indexes(db: &Database) -> Result<(), StoreError> {
    let col = db.collection::<mongodb::bson::Document>("alerts");

    // evaluation scan: active alerts
    let model = IndexModel::builder()
        .keys(doc! { "status": 1, "symbol": 1 })
        .build();
    col.create_index(model, None).await?;

    // owner listing sorted by created_at desc
    let model = IndexModel::builder()
        .keys(doc! { "owner_id": 1, "created_at": -1 })
        .build();
    col.create_index(model, None).await?;

    Ok(())
}

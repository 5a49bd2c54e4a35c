//! Ticket persistence: paging, create, partial update with wholesale image
//! replacement, and delete.
//!
//! Every mutation that touches both a ticket and its images runs inside one
//! transaction, so readers never see a ticket with a half-replaced image set.
//! Concurrent updates of the same ticket are last-write-wins.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, LoaderTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entity::ticket::{self, Entity as Ticket, Priority, WorkType};
use crate::entity::ticket_image::{self, Entity as TicketImage};
use crate::error::{AppError, AppResult};
use crate::validation::{ListQuery, NewTicket, TicketPatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: i32,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ticket_image::Model> for ImageView {
    fn from(image: ticket_image::Model) -> Self {
        Self {
            id: image.id,
            url: image.url,
            created_at: image.created_at,
        }
    }
}

/// A ticket as returned by the API, images included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: i32,
    pub account_name: String,
    pub city: String,
    pub contact_person: Option<String>,
    pub contact_info: Option<String>,
    pub priority: Priority,
    pub work_type: Option<WorkType>,
    pub lease: bool,
    pub under_warranty: bool,
    pub machine_model_or_type: Option<String>,
    pub issue_description: Option<String>,
    pub requesting_tech_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<ImageView>,
}

impl TicketView {
    fn new(ticket: ticket::Model, mut images: Vec<ticket_image::Model>) -> Self {
        images.sort_by_key(|image| image.id);
        Self {
            id: ticket.id,
            account_name: ticket.account_name,
            city: ticket.city,
            contact_person: ticket.contact_person,
            contact_info: ticket.contact_info,
            priority: ticket.priority,
            work_type: ticket.work_type,
            lease: ticket.lease,
            under_warranty: ticket.under_warranty,
            machine_model_or_type: ticket.machine_model_or_type,
            issue_description: ticket.issue_description,
            requesting_tech_name: ticket.requesting_tech_name,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
            images: images.into_iter().map(ImageView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(query: ListQuery, total: u64) -> Self {
        Self {
            page: query.page,
            page_size: query.page_size,
            total,
            total_pages: total_pages(total, query.page_size),
        }
    }
}

/// `ceil(total / page_size)`, never less than one.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size.max(1)).max(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct TicketService {
    db: DatabaseConnection,
}

impl TicketService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, query: ListQuery) -> AppResult<Page<TicketView>> {
        let total = Ticket::find().count(&self.db).await?;

        // Pages past the end are answered without a query.
        let tickets = match query.offset().filter(|offset| *offset < total) {
            Some(offset) => {
                Ticket::find()
                    .order_by_asc(ticket::Column::Id)
                    .offset(offset)
                    .limit(query.page_size)
                    .all(&self.db)
                    .await?
            }
            None => Vec::new(),
        };
        let images = tickets.load_many(TicketImage, &self.db).await?;

        let data = tickets
            .into_iter()
            .zip(images)
            .map(|(ticket, images)| TicketView::new(ticket, images))
            .collect();

        Ok(Page {
            data,
            pagination: Pagination::new(query, total),
        })
    }

    pub async fn get(&self, id: i32) -> AppResult<TicketView> {
        let ticket = Ticket::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        self.with_images(&self.db, ticket).await
    }

    pub async fn create(&self, new: NewTicket) -> AppResult<TicketView> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let ticket = ticket::ActiveModel {
            account_name: Set(new.account_name),
            city: Set(new.city),
            contact_person: Set(new.contact_person),
            contact_info: Set(new.contact_info),
            priority: Set(new.priority),
            work_type: Set(new.work_type),
            lease: Set(new.lease),
            under_warranty: Set(new.under_warranty),
            machine_model_or_type: Set(new.machine_model_or_type),
            issue_description: Set(new.issue_description),
            requesting_tech_name: Set(new.requesting_tech_name),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_images(&txn, ticket.id, new.pictures).await?;
        let view = self.with_images(&txn, ticket).await?;
        txn.commit().await?;

        info!(ticket_id = view.id, images = view.images.len(), "ticket created");
        Ok(view)
    }

    pub async fn update(&self, id: i32, patch: TicketPatch) -> AppResult<TicketView> {
        let txn = self.db.begin().await?;

        let existing = Ticket::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ticket::ActiveModel = existing.into();
        if let Some(account_name) = patch.account_name {
            active.account_name = Set(account_name);
        }
        if let Some(city) = patch.city {
            active.city = Set(city);
        }
        if let Some(contact_person) = patch.contact_person {
            active.contact_person = Set(contact_person);
        }
        if let Some(contact_info) = patch.contact_info {
            active.contact_info = Set(contact_info);
        }
        if let Some(priority) = patch.priority {
            active.priority = Set(priority);
        }
        if let Some(work_type) = patch.work_type {
            active.work_type = Set(Some(work_type));
        }
        if let Some(lease) = patch.lease {
            active.lease = Set(lease);
        }
        if let Some(under_warranty) = patch.under_warranty {
            active.under_warranty = Set(under_warranty);
        }
        if let Some(machine) = patch.machine_model_or_type {
            active.machine_model_or_type = Set(machine);
        }
        if let Some(description) = patch.issue_description {
            active.issue_description = Set(description);
        }
        if let Some(tech) = patch.requesting_tech_name {
            active.requesting_tech_name = Set(Some(tech));
        }
        active.updated_at = Set(Utc::now());

        let ticket = active.update(&txn).await?;

        if let Some(pictures) = patch.pictures {
            TicketImage::delete_many()
                .filter(ticket_image::Column::TicketId.eq(ticket.id))
                .exec(&txn)
                .await?;
            insert_images(&txn, ticket.id, pictures).await?;
        }

        let view = self.with_images(&txn, ticket).await?;
        txn.commit().await?;

        info!(ticket_id = view.id, "ticket updated");
        Ok(view)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let existing = Ticket::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        TicketImage::delete_many()
            .filter(ticket_image::Column::TicketId.eq(existing.id))
            .exec(&txn)
            .await?;
        existing.delete(&txn).await?;
        txn.commit().await?;

        info!(ticket_id = id, "ticket deleted");
        Ok(())
    }

    async fn with_images<C: ConnectionTrait>(
        &self,
        conn: &C,
        ticket: ticket::Model,
    ) -> AppResult<TicketView> {
        let images = TicketImage::find()
            .filter(ticket_image::Column::TicketId.eq(ticket.id))
            .order_by_asc(ticket_image::Column::Id)
            .all(conn)
            .await?;
        Ok(TicketView::new(ticket, images))
    }
}

async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    ticket_id: i32,
    urls: Vec<String>,
) -> AppResult<()> {
    if urls.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows = urls.into_iter().map(|url| ticket_image::ActiveModel {
        ticket_id: Set(ticket_id),
        url: Set(url),
        created_at: Set(now),
        ..Default::default()
    });
    TicketImage::insert_many(rows).exec(conn).await?;
    Ok(())
}

//! Transactional e-mails produced by lifecycle transitions.
//!
//! A [`Notification`] is written to the outbox in the same transaction as the
//! state change that caused it, then rendered and sent by the dispatcher.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;
use super::booking::{Booking, ServiceType, Urgency};
use super::entity::EntityKind;
use super::order::{DeliveryMethod, KeyType, Order};
use super::pricing::format_cents;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    AdminNewOrder {
        order_id: Uuid,
        email: String,
        key_type: KeyType,
        quantity: i32,
        total_cents: i64,
        requires_verification: bool,
    },
    OrderConfirmed {
        order_id: Uuid,
        email: String,
        tracking_token: String,
        key_type: KeyType,
        quantity: i32,
        total_cents: i64,
        delivery_method: DeliveryMethod,
        delivery_address: Address,
    },
    OrderVerified {
        order_id: Uuid,
        email: String,
        tracking_token: String,
    },
    OrderVerificationRejected {
        order_id: Uuid,
        email: String,
    },
    OrderCancelled {
        order_id: Uuid,
        email: String,
    },
    OrderShipped {
        order_id: Uuid,
        email: String,
        tracking_token: String,
        tracking_number: Option<String>,
    },
    AdminNewBooking {
        booking_id: Uuid,
        name: String,
        email: String,
        service_type: ServiceType,
        urgency: Urgency,
        preferred_date: NaiveDate,
        preferred_time_slot: String,
        total_cents: i64,
    },
    BookingConfirmed {
        booking_id: Uuid,
        email: String,
        tracking_token: String,
        service_type: ServiceType,
        preferred_date: NaiveDate,
        preferred_time_slot: String,
        service_address: Address,
        total_cents: i64,
    },
    BookingAssigned {
        booking_id: Uuid,
        email: String,
        tracking_token: String,
        locksmith_name: String,
        locksmith_phone: String,
    },
    BookingCancelled {
        booking_id: Uuid,
        email: String,
    },
    ContactMessage {
        name: String,
        email: String,
        phone: Option<String>,
        subject: String,
        message: String,
    },
}

/// Rendered e-mail handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Deployment details templates need.
#[derive(Debug, Clone)]
pub struct EmailContext {
    pub admin_email: String,
    pub app_url: String,
}

impl EmailContext {
    fn tracking_url(&self, token: &str) -> String {
        format!("{}/track?id={}", self.app_url.trim_end_matches('/'), token)
    }
}

impl Notification {
    pub fn order_confirmed(order: &Order) -> Self {
        Notification::OrderConfirmed {
            order_id: order.id,
            email: order.email.clone(),
            tracking_token: order.tracking_token.clone(),
            key_type: order.key_type,
            quantity: order.quantity,
            total_cents: order.total_cents,
            delivery_method: order.delivery_method,
            delivery_address: order.delivery_address.clone(),
        }
    }

    pub fn booking_confirmed(booking: &Booking) -> Self {
        Notification::BookingConfirmed {
            booking_id: booking.id,
            email: booking.email.clone(),
            tracking_token: booking.tracking_token.clone(),
            service_type: booking.service_type,
            preferred_date: booking.preferred_date,
            preferred_time_slot: booking.preferred_time_slot.clone(),
            service_address: booking.service_address.clone(),
            total_cents: booking.total_cents,
        }
    }

    /// Outbox event type, e.g. `order_verified`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Notification::AdminNewOrder { .. } => "admin_new_order",
            Notification::OrderConfirmed { .. } => "order_confirmed",
            Notification::OrderVerified { .. } => "order_verified",
            Notification::OrderVerificationRejected { .. } => "order_verification_rejected",
            Notification::OrderCancelled { .. } => "order_cancelled",
            Notification::OrderShipped { .. } => "order_shipped",
            Notification::AdminNewBooking { .. } => "admin_new_booking",
            Notification::BookingConfirmed { .. } => "booking_confirmed",
            Notification::BookingAssigned { .. } => "booking_assigned",
            Notification::BookingCancelled { .. } => "booking_cancelled",
            Notification::ContactMessage { .. } => "contact_message",
        }
    }

    /// The aggregate the message belongs to; contact messages have none.
    pub fn aggregate(&self) -> Option<(EntityKind, Uuid)> {
        match self {
            Notification::AdminNewOrder { order_id, .. }
            | Notification::OrderConfirmed { order_id, .. }
            | Notification::OrderVerified { order_id, .. }
            | Notification::OrderVerificationRejected { order_id, .. }
            | Notification::OrderCancelled { order_id, .. }
            | Notification::OrderShipped { order_id, .. } => Some((EntityKind::Order, *order_id)),
            Notification::AdminNewBooking { booking_id, .. }
            | Notification::BookingConfirmed { booking_id, .. }
            | Notification::BookingAssigned { booking_id, .. }
            | Notification::BookingCancelled { booking_id, .. } => {
                Some((EntityKind::Booking, *booking_id))
            }
            Notification::ContactMessage { .. } => None,
        }
    }

    pub fn render(&self, ctx: &EmailContext) -> EmailMessage {
        match self {
            Notification::AdminNewOrder {
                order_id,
                email,
                key_type,
                quantity,
                total_cents,
                requires_verification,
            } => EmailMessage {
                to: ctx.admin_email.clone(),
                subject: format!(
                    "New Order: {order_id}{}",
                    if *requires_verification { " - VERIFICATION REQUIRED" } else { "" }
                ),
                html: layout(
                    "New Key Copy Order",
                    &format!(
                        "<p><strong>Order ID:</strong> {order_id}</p>\
                         <p><strong>Customer:</strong> {}</p>\
                         <p><strong>Key Type:</strong> {key_type} x {quantity}</p>\
                         <p><strong>Total:</strong> {} AUD</p>{}",
                        escape(email),
                        format_cents(*total_cents),
                        if *requires_verification {
                            "<p><strong>Proof of ownership must be reviewed before cutting.</strong></p>"
                        } else {
                            ""
                        }
                    ),
                ),
            },
            Notification::OrderConfirmed {
                order_id,
                email,
                tracking_token,
                key_type,
                quantity,
                total_cents,
                delivery_method,
                delivery_address,
            } => EmailMessage {
                to: email.clone(),
                subject: format!("Order Confirmed - {tracking_token}"),
                html: layout(
                    "Order Confirmed!",
                    &format!(
                        "<p>Thank you for your order! We've received your key copy request.</p>\
                         <p><strong>Order ID:</strong> {order_id}</p>\
                         <p><strong>Key Type:</strong> {key_type}</p>\
                         <p><strong>Quantity:</strong> {quantity}</p>\
                         <p><strong>Delivery:</strong> {delivery_method} to {}</p>\
                         <p><strong>Total:</strong> {} AUD (inc. GST)</p>\
                         <p><a href=\"{}\">Track Order</a></p>",
                        escape(&delivery_address.one_line()),
                        format_cents(*total_cents),
                        ctx.tracking_url(tracking_token)
                    ),
                ),
            },
            Notification::OrderVerified {
                order_id,
                email,
                tracking_token,
            } => EmailMessage {
                to: email.clone(),
                subject: "Your Key Copy Order Has Been Verified".to_string(),
                html: layout(
                    "Order Verified",
                    &format!(
                        "<p>Great news! Your restricted key order has been verified and approved.</p>\
                         <p><strong>Order ID:</strong> {order_id}</p>\
                         <p>We'll now proceed with cutting your keys and will notify you when they're shipped.</p>\
                         <p><a href=\"{}\">Track Your Order</a></p>",
                        ctx.tracking_url(tracking_token)
                    ),
                ),
            },
            Notification::OrderVerificationRejected { order_id, email } => EmailMessage {
                to: email.clone(),
                subject: "Update on Your Key Copy Order".to_string(),
                html: layout(
                    "Order Verification Issue",
                    &format!(
                        "<p>We were unable to verify ownership for your restricted key order.</p>\
                         <p><strong>Order ID:</strong> {order_id}</p>\
                         <p>Your payment will be refunded within 5-7 business days.</p>\
                         <p>If you believe this is an error, please contact us with additional documentation.</p>"
                    ),
                ),
            },
            Notification::OrderCancelled { order_id, email } => EmailMessage {
                to: email.clone(),
                subject: format!("Order Cancelled - {order_id}"),
                html: layout(
                    "Order Cancelled",
                    &format!(
                        "<p>Your key copy order has been cancelled.</p>\
                         <p><strong>Order ID:</strong> {order_id}</p>"
                    ),
                ),
            },
            Notification::OrderShipped {
                order_id,
                email,
                tracking_token,
                tracking_number,
            } => EmailMessage {
                to: email.clone(),
                subject: format!("Your Keys Are On The Way - {tracking_token}"),
                html: layout(
                    "Order Shipped",
                    &format!(
                        "<p>Your keys have been cut and shipped.</p>\
                         <p><strong>Order ID:</strong> {order_id}</p>{}\
                         <p><a href=\"{}\">Track Your Order</a></p>",
                        tracking_number
                            .as_deref()
                            .map(|n| format!("<p><strong>Tracking number:</strong> {}</p>", escape(n)))
                            .unwrap_or_default(),
                        ctx.tracking_url(tracking_token)
                    ),
                ),
            },
            Notification::AdminNewBooking {
                booking_id,
                name,
                email,
                service_type,
                urgency,
                preferred_date,
                preferred_time_slot,
                total_cents,
            } => EmailMessage {
                to: ctx.admin_email.clone(),
                subject: format!("New Booking: {preferred_date} - {service_type}"),
                html: layout(
                    "New Locksmith Booking",
                    &format!(
                        "<p><strong>Booking ID:</strong> {booking_id}</p>\
                         <p><strong>Customer:</strong> {} ({})</p>\
                         <p><strong>Service:</strong> {service_type} ({urgency})</p>\
                         <p><strong>When:</strong> {preferred_date} {}</p>\
                         <p><strong>Total:</strong> {} AUD</p>",
                        escape(name),
                        escape(email),
                        escape(preferred_time_slot),
                        format_cents(*total_cents)
                    ),
                ),
            },
            Notification::BookingConfirmed {
                booking_id,
                email,
                tracking_token,
                service_type,
                preferred_date,
                preferred_time_slot,
                service_address,
                total_cents,
            } => EmailMessage {
                to: email.clone(),
                subject: format!("Locksmith Booking Confirmed - {preferred_date}"),
                html: layout(
                    "Booking Confirmed!",
                    &format!(
                        "<p>Your locksmith appointment has been confirmed.</p>\
                         <p><strong>{preferred_date} at {}</strong></p>\
                         <p>{}</p>\
                         <p><strong>Booking ID:</strong> {booking_id}</p>\
                         <p><strong>Service:</strong> {service_type}</p>\
                         <p><strong>Total:</strong> {} AUD (inc. GST)</p>\
                         <p><a href=\"{}\">View Booking</a></p>",
                        escape(preferred_time_slot),
                        escape(&service_address.one_line()),
                        format_cents(*total_cents),
                        ctx.tracking_url(tracking_token)
                    ),
                ),
            },
            Notification::BookingAssigned {
                booking_id,
                email,
                tracking_token,
                locksmith_name,
                locksmith_phone,
            } => EmailMessage {
                to: email.clone(),
                subject: "Your Locksmith Has Been Assigned".to_string(),
                html: layout(
                    "Locksmith Assigned",
                    &format!(
                        "<p><strong>{}</strong> will attend your booking {booking_id}.</p>\
                         <p>They will call from {} about 15 minutes before arrival.</p>\
                         <p><a href=\"{}\">View Booking</a></p>",
                        escape(locksmith_name),
                        escape(locksmith_phone),
                        ctx.tracking_url(tracking_token)
                    ),
                ),
            },
            Notification::BookingCancelled { booking_id, email } => EmailMessage {
                to: email.clone(),
                subject: format!("Booking Cancelled - {booking_id}"),
                html: layout(
                    "Booking Cancelled",
                    &format!(
                        "<p>Your locksmith booking has been cancelled.</p>\
                         <p><strong>Booking ID:</strong> {booking_id}</p>"
                    ),
                ),
            },
            Notification::ContactMessage {
                name,
                email,
                phone,
                subject,
                message,
            } => EmailMessage {
                to: ctx.admin_email.clone(),
                subject: format!("Contact Form: {subject}"),
                html: layout(
                    "New Contact Form Submission",
                    &format!(
                        "<p><strong>Name:</strong> {}</p>\
                         <p><strong>Email:</strong> {}</p>\
                         <p><strong>Phone:</strong> {}</p>\
                         <p><strong>Message:</strong></p><p>{}</p>",
                        escape(name),
                        escape(email),
                        escape(phone.as_deref().unwrap_or("-")),
                        escape(message).replace('\n', "<br>")
                    ),
                ),
            },
        }
    }
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <div style=\"max-width: 600px; margin: 0 auto;\">\
         <h2 style=\"color: #1e3a5f;\">{heading}</h2>{body}\
         <p style=\"color: #666; font-size: 14px;\">Questions? Reply to this email.</p>\
         </div></body></html>"
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

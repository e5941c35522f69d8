//! Supertraits for common effect combinations
//!
//! These group the collaborator traits each part of the SOS flow needs so
//! type signatures stay readable.

use super::{
    BatteryEffects, DocumentStoreEffects, HapticEffects, LocationEffects, NoticeEffects,
    PermissionEffects, PhysicalTimeEffects, RandomEffects, SmsEffects,
};

/// Effects needed to run a live-location session
pub trait LiveLocationEffects:
    PermissionEffects + LocationEffects + DocumentStoreEffects + PhysicalTimeEffects + RandomEffects
{
}

/// Automatic implementation for types that satisfy the required bounds
impl<T> LiveLocationEffects for T where
    T: PermissionEffects
        + LocationEffects
        + DocumentStoreEffects
        + PhysicalTimeEffects
        + RandomEffects
{
}

/// Effects needed to fan an alert out over SMS and chat
pub trait FanOutEffects: SmsEffects + DocumentStoreEffects {}

/// Automatic implementation for types that satisfy the required bounds
impl<T> FanOutEffects for T where T: SmsEffects + DocumentStoreEffects {}

/// Everything the SOS coordinator touches
pub trait SosEffects:
    LiveLocationEffects + FanOutEffects + BatteryEffects + HapticEffects + NoticeEffects
{
}

/// Automatic implementation for types that satisfy the required bounds
impl<T> SosEffects for T where
    T: LiveLocationEffects + FanOutEffects + BatteryEffects + HapticEffects + NoticeEffects
{
}

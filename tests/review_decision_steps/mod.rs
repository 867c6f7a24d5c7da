//! Step definitions for review decision scenarios.


mod given;

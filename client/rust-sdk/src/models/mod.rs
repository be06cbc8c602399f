pub mod blog;
pub mod course;
pub mod family;
pub mod leaderboard;
pub mod premium;
pub mod quiz;
pub mod user;

pub use blog::{BlogMedia, BlogPost, NewBlogPost, MAX_BLOG_MEDIA};
pub use course::{Course, Lesson, NewCourse, NewLesson};
pub use family::{Family, FamilyMember, MemberRef, NewFamily};
pub use leaderboard::LeaderboardEntry;
pub use premium::PremiumPlan;
pub use quiz::{Quiz, QuizQuestion, QuizSubmission};
pub use user::{
    League, LoginRequest, ProfileUpdate, ResetPasswordRequest, Role, SignupRequest, User,
    VerifyOtpRequest,
};

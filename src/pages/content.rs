//! Copy for the marketing pages.

/// A service the agency sells.
#[derive(Debug, Clone, Copy)]
pub struct Service {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub body: &'static [&'static str],
}

/// A blog post.
#[derive(Debug, Clone, Copy)]
pub struct Post {
    pub slug: &'static str,
    pub title: &'static str,
    pub date: &'static str,
    pub summary: &'static str,
    pub body: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct Testimonial {
    pub quote: &'static str,
    pub author: &'static str,
    pub company: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct TeamMember {
    pub name: &'static str,
    pub role: &'static str,
}

pub const SERVICES: &[Service] = &[
    Service {
        slug: "web-design",
        title: "Web Design",
        summary: "Fast, accessible sites that turn visitors into customers.",
        body: &[
            "We design and build websites around one question: what should a visitor do next?",
            "Every page is measured against that goal, from the first wireframe to launch day.",
        ],
    },
    Service {
        slug: "seo",
        title: "Search Engine Optimization",
        summary: "Get found by the people already looking for you.",
        body: &[
            "We audit your site, fix what search engines trip over, and plan content that ranks.",
            "Monthly reports show rankings, traffic and the leads they produced.",
        ],
    },
    Service {
        slug: "paid-ads",
        title: "Paid Advertising",
        summary: "Search and social campaigns tuned for cost per lead.",
        body: &[
            "We run campaigns on the platforms your customers use and cut spend that does not convert.",
            "Landing pages and ads are tested together so budget follows results.",
        ],
    },
    Service {
        slug: "social-media",
        title: "Social Media",
        summary: "A steady presence without the daily scramble.",
        body: &[
            "We plan, write and schedule posts in your voice and answer your community.",
        ],
    },
];

pub const POSTS: &[Post] = &[
    Post {
        slug: "five-signs-your-website-needs-a-refresh",
        title: "Five signs your website needs a refresh",
        date: "2024-03-12",
        summary: "Slow pages, vague calls to action and other quiet lead killers.",
        body: &[
            "Most sites do not fail loudly. They leak visitors one slow page at a time.",
            "If your pages take more than three seconds to load, start there.",
            "Next, check that every page ends with a clear next step for the visitor.",
        ],
    },
    Post {
        slug: "local-seo-basics",
        title: "Local SEO basics for small businesses",
        date: "2024-02-20",
        summary: "Claim your listings, collect reviews and be consistent.",
        body: &[
            "Local search rewards consistency: the same name, address and phone everywhere.",
            "Reviews matter too. Ask happy customers, and answer every review you get.",
        ],
    },
    Post {
        slug: "measuring-what-matters",
        title: "Measuring what matters",
        date: "2024-01-08",
        summary: "Why leads beat pageviews as the number to watch.",
        body: &[
            "Traffic is easy to grow and easy to misread.",
            "Track the actions that bring revenue: calls, form fills and booked meetings.",
        ],
    },
];

pub const TESTIMONIALS: &[Testimonial] = &[
    Testimonial {
        quote: "Our enquiries doubled within three months of the relaunch.",
        author: "Maria Lopez",
        company: "Lopez Dental",
    },
    Testimonial {
        quote: "They explained every change and every number. No jargon.",
        author: "Tom Becker",
        company: "Becker Roofing",
    },
];

pub const TEAM: &[TeamMember] = &[
    TeamMember {
        name: "Priya Raman",
        role: "Founder and strategy",
    },
    TeamMember {
        name: "Jonas Weber",
        role: "Design lead",
    },
    TeamMember {
        name: "Aisha Cole",
        role: "Search and ads",
    },
];

#[must_use]
pub fn service(slug: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.slug == slug)
}

#[must_use]
pub fn post(slug: &str) -> Option<&'static Post> {
    POSTS.iter().find(|p| p.slug == slug)
}
